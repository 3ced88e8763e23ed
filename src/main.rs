//! TOP Compiler CLI

use clap::Parser as ClapParser;
use std::fs;
use std::path::PathBuf;
use std::process;
use toplang::codegen::CodeGenerator;
use toplang::diagnostics::Diagnostics;
use toplang::{Lexer, Parser, TopResult, LANGUAGE_NAME, VERSION};

#[derive(ClapParser, Debug)]
#[command(name = "top")]
#[command(version = VERSION)]
#[command(about = "Compiler for the TOP language", long_about = None)]
struct Args {
    /// Source file to compile
    input: Option<PathBuf>,

    /// Save the generated LLVM IR to <input>.ll
    #[arg(long)]
    emit_llvm: bool,

    /// Skip executing the compiled program
    #[arg(long)]
    no_exec: bool,

    /// Compile to a native executable with the given name
    #[arg(long, value_name = "NAME")]
    compile: Option<String>,

    /// Execute an existing LLVM IR file directly
    #[arg(long, value_name = "FILE")]
    exec_ir: Option<PathBuf>,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(err) = run(&args) {
        eprintln!("ERROR: {}", err);
        process::exit(1);
    }
}

fn run(args: &Args) -> TopResult<()> {
    // Direct IR execution needs no source file.
    if let Some(ir_file) = &args.exec_ir {
        println!("Executing IR file: {}", ir_file.display());
        return CodeGenerator::execute_ir_file(ir_file);
    }

    let input = match &args.input {
        Some(path) => path,
        None => {
            eprintln!("No input file provided. Use --help for usage.");
            process::exit(1);
        }
    };

    let source = fs::read_to_string(input)?;

    println!("{} Compiler v{}", LANGUAGE_NAME, VERSION);
    println!("Compiling {}...", input.display());

    let tokens = Lexer::new(&source).tokenize();
    println!("Lexical analysis completed.");

    let mut parser = Parser::new(&tokens);
    let program = parser.parse();
    if !parser.errors().is_empty() {
        let filename = input
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("input");
        let diag = Diagnostics::new(&source, filename);
        for err in parser.errors() {
            eprint!("{}", diag.format_error(err));
        }
    }
    println!("Parsing completed.");

    let mut codegen = CodeGenerator::new();
    codegen.generate(&program);
    println!("Code generation completed.");

    if args.emit_llvm {
        let ir_path = format!("{}.ll", input.display());
        codegen.save_ir(&ir_path)?;
        println!("LLVM IR saved to: {}", ir_path);
    }

    if let Some(name) = &args.compile {
        codegen.compile_to_executable(name)?;
    }

    if !args.no_exec {
        println!("Executing program...");
        codegen.execute()?;
    }

    Ok(())
}
