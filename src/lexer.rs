//! TOP Lexer - English-word operators and keywords
//!
//! Scans TOP source left to right. Newlines are significant (statements
//! recover per line, so every `\n` becomes an `Eol` token), `#` starts a
//! line comment, and any byte the grammar does not recognize becomes an
//! `Unknown` token instead of aborting the scan.

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\f]+")]
pub enum TokenKind {
    // === Keywords ===
    #[token("function")]
    Function,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("var")]
    Var,
    #[token("const")]
    Const,
    #[token("print")]
    Print,

    // === Word operators ===
    #[token("plus")]
    Plus,
    #[token("minus")]
    Minus,
    #[token("times")]
    Times,
    #[token("divided")]
    Divided,
    #[token("is")]
    Is,
    #[token("equals")]
    Equals,
    #[token("not")]
    Not,
    #[token("greater")]
    Greater,
    #[token("less")]
    Less,

    // === Punctuation ===
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token(",")]
    Comma,

    // === Literals ===
    #[regex(r"[0-9]+(\.[0-9]*)?")]
    Number,
    #[regex(r#""[^"]*""#)]
    String,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    // === Structural ===
    #[regex(r"#[^\n]*")]
    Comment,
    #[token("\n")]
    Eol,

    // Synthetic kinds, never matched by the scanner itself
    Unknown,
    EndOfFile,
}

/// A token with its kind, matched text, and 1-based source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
            column,
        }
    }
}

pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Scan the whole source into tokens. The result always ends with an
    /// `EndOfFile` token, whatever the input; bytes no pattern matches come
    /// back as `Unknown` tokens and are left for the parser to report.
    pub fn tokenize(&self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut lex = TokenKind::lexer(self.source);
        let mut line = 1usize;
        let mut line_start = 0usize;
        let mut scanned = 0usize;

        while let Some(result) = lex.next() {
            let span = lex.span();

            // Count newlines between the previous token start and this one
            // so positions stay right across skipped whitespace, comments,
            // and string literals that span lines.
            for (offset, byte) in self.source[scanned..span.start].bytes().enumerate() {
                if byte == b'\n' {
                    line += 1;
                    line_start = scanned + offset + 1;
                }
            }
            scanned = span.start;
            let column = span.start - line_start + 1;

            match result {
                Ok(TokenKind::Comment) => continue,
                Ok(TokenKind::String) => {
                    // Delimiters are stripped; the lexeme is the contents.
                    let slice = lex.slice();
                    tokens.push(Token::new(
                        TokenKind::String,
                        &slice[1..slice.len() - 1],
                        line,
                        column,
                    ));
                }
                Ok(kind) => tokens.push(Token::new(kind, lex.slice(), line, column)),
                Err(()) => tokens.push(Token::new(TokenKind::Unknown, lex.slice(), line, column)),
            }
        }

        for (offset, byte) in self.source[scanned..].bytes().enumerate() {
            if byte == b'\n' {
                line += 1;
                line_start = scanned + offset + 1;
            }
        }
        tokens.push(Token::new(
            TokenKind::EndOfFile,
            "",
            line,
            self.source.len() - line_start + 1,
        ));
        tokens
    }
}
