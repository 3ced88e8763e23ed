//! TOP Code Generation

pub mod llvm;

pub use llvm::CodeGenerator;
