//! # TOP - a tiny language that reads like English
//!
//! TOP programs use word operators (`plus`, `is`, `greater than`) instead
//! of symbols:
//!
//! ```top
//! function add(a, b) { return a plus b }
//! print add(2, 3)
//! ```
//!
//! The compiler is a single forward pass: source text is tokenized, parsed
//! into an AST, and lowered to a textual LLVM IR module. The module can be
//! dumped for inspection, saved to a `.ll` file, linked into a native
//! executable with `clang`, or run directly through `lli`.

pub mod ast;
pub mod codegen;
pub mod diagnostics;
pub mod error;
pub mod lexer;
pub mod parser;

pub use codegen::CodeGenerator;
pub use error::{TopError, TopResult};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

/// Version of the TOP language
pub const VERSION: &str = "0.1.0";
pub const LANGUAGE_NAME: &str = "TOP";

/// Run the front end over `source` and return the textual IR module.
///
/// Codegen diagnostics go to standard error; statements that fail to parse
/// are dropped, and the returned module reflects whatever was lowered.
pub fn compile_to_ir(source: &str) -> String {
    let tokens = Lexer::new(source).tokenize();
    let mut parser = Parser::new(&tokens);
    let program = parser.parse();

    let mut codegen = CodeGenerator::new();
    codegen.compile_program(&program);
    codegen.module_ir()
}
