//! Pretty error reporting for TOP
//! Shows source context with line numbers and a caret under the offender

use crate::error::TopError;

/// Diagnostic renderer for pretty error messages
pub struct Diagnostics<'a> {
    source: &'a str,
    filename: &'a str,
}

impl<'a> Diagnostics<'a> {
    pub fn new(source: &'a str, filename: &'a str) -> Self {
        Self { source, filename }
    }

    /// Format an error with source context where a position is available
    pub fn format_error(&self, error: &TopError) -> String {
        match error {
            TopError::Parser {
                message,
                line,
                column,
            } => self.format_with_context("Parse Error", message, *line, *column),
            other => format!("\n\x1b[1;31merror\x1b[0m: {}\n", other),
        }
    }

    fn format_with_context(
        &self,
        error_type: &str,
        message: &str,
        line: usize,
        column: usize,
    ) -> String {
        let line_content = self.get_line(line);

        let mut output = String::new();

        // Error header
        output.push_str(&format!(
            "\n\x1b[1;31merror[{}]\x1b[0m: {}\n",
            error_type, message
        ));

        // Location
        output.push_str(&format!(
            "  \x1b[1;34m-->\x1b[0m {}:{}:{}\n",
            self.filename, line, column
        ));

        // Separator
        output.push_str("   \x1b[1;34m|\x1b[0m\n");

        // Source line
        output.push_str(&format!(
            "\x1b[1;34m{:>3} |\x1b[0m {}\n",
            line, line_content
        ));

        // Caret under the offending column
        let pointer_offset = column.saturating_sub(1).min(line_content.len());
        output.push_str(&format!(
            "   \x1b[1;34m|\x1b[0m {}\x1b[1;31m^\x1b[0m\n",
            " ".repeat(pointer_offset)
        ));

        // Separator
        output.push_str("   \x1b[1;34m|\x1b[0m\n");

        output
    }

    fn get_line(&self, line: usize) -> &str {
        self.source.lines().nth(line.saturating_sub(1)).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_lookup() {
        let source = "var x is 5\nprint x\nprint y";
        let diag = Diagnostics::new(source, "test.top");
        assert_eq!(diag.get_line(1), "var x is 5");
        assert_eq!(diag.get_line(2), "print x");
        assert_eq!(diag.get_line(99), "");
    }

    #[test]
    fn test_parse_error_context() {
        let source = "var x is\nprint 5";
        let diag = Diagnostics::new(source, "test.top");
        let err = TopError::parser("Expected expression, found end of line", 1, 9);
        let rendered = diag.format_error(&err);
        assert!(rendered.contains("test.top:1:9"));
        assert!(rendered.contains("var x is"));
        assert!(rendered.contains("Expected expression"));
    }
}
