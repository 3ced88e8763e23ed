//! LLVM IR Generator
//!
//! Generates textual LLVM IR which can be compiled by `clang` or run
//! directly with `lli`. No LLVM library is linked at build time; the
//! toolchain is only needed when a module is executed or linked.
//!
//! Every value in the language is a 64-bit float. Variables live in slots
//! allocated in the owning function's entry block and are accessed by
//! load/store. Comparisons produce `i1` values which drive branches
//! directly; where an `i1` meets a slot, an argument, or arithmetic, it is
//! widened back to `double` with a single `uitofp`.

use crate::ast::{BinaryOp, Block, Expr, Function, Program, Stmt};
use crate::error::{TopError, TopResult};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Command;

/// C source for the print helpers linked with every generated module.
const PRINT_HELPERS_C: &str = "#include <stdio.h>\n\n\
void printDouble(double value) {\n    printf(\"%f\\n\", value);\n}\n\n\
void printString(const char* str) {\n    printf(\"%s\\n\", str);\n}\n";

pub struct CodeGenerator {
    /// Finished function definitions, in emission order.
    functions_ir: Vec<String>,
    /// Interned string literals: (contents, global name).
    strings: Vec<(String, String)>,
    /// Known functions: name -> parameter count.
    functions: HashMap<String, usize>,
    /// Variable slots of the function being emitted: name -> slot register.
    named_values: HashMap<String, String>,
    /// Alloca lines hoisted to the current function's entry block.
    entry_allocas: Vec<String>,
    /// Instructions of the current function past the alloca prologue.
    body: String,
    reg_count: usize,
    label_count: usize,
    slot_count: usize,
    /// Whether the current basic block already ends in a terminator.
    terminated: bool,
    in_function: bool,
    errors: Vec<String>,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self {
            functions_ir: Vec::new(),
            strings: Vec::new(),
            functions: HashMap::new(),
            named_values: HashMap::new(),
            entry_allocas: Vec::new(),
            body: String::new(),
            reg_count: 0,
            label_count: 0,
            slot_count: 0,
            terminated: false,
            in_function: false,
            errors: Vec::new(),
        }
    }

    /// Lower the program and dump the resulting module to standard output.
    pub fn generate(&mut self, program: &Program) {
        self.compile_program(program);
        self.dump_ir();
    }

    /// Lower the program into the module without printing it.
    pub fn compile_program(&mut self, program: &Program) {
        // Register every function signature up front so call sites may
        // precede definitions.
        self.register_functions(&program.statements);

        for stmt in &program.statements {
            self.compile_stmt(stmt);
        }
    }

    pub fn dump_ir(&self) {
        println!("\n=== Generated LLVM IR ===");
        print!("{}", self.module_ir());
        println!("=========================");
    }

    /// Assemble the module text: externs, functions, the synthetic `main`
    /// holding top-level statements, and string constants.
    pub fn module_ir(&self) -> String {
        let mut out = String::new();
        out.push_str("; ModuleID = 'toplang'\n");
        out.push_str("source_filename = \"toplang\"\n\n");
        out.push_str("declare void @printDouble(double)\n");
        out.push_str("declare void @printString(i8*)\n\n");

        for func in &self.functions_ir {
            out.push_str(func);
            out.push('\n');
        }

        out.push_str("define i32 @main() {\nentry:\n");
        for alloca in &self.entry_allocas {
            out.push_str(alloca);
            out.push('\n');
        }
        out.push_str(&self.body);
        out.push_str("  ret i32 0\n}\n");

        if !self.strings.is_empty() {
            out.push('\n');
        }
        for (contents, name) in &self.strings {
            out.push_str(&format!(
                "{} = private unnamed_addr constant [{} x i8] c\"{}\", align 1\n",
                name,
                contents.len() + 1,
                escape_string(contents)
            ));
        }

        out
    }

    /// Diagnostics emitted during lowering, in order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn save_ir(&self, path: impl AsRef<Path>) -> TopResult<()> {
        fs::write(path, self.module_ir())?;
        Ok(())
    }

    /// Write the module and helper C file, link them with clang into a
    /// native executable, and delete the intermediates.
    pub fn compile_to_executable(&self, output: &str) -> TopResult<()> {
        let ir_path = format!("{}.ll", output);
        let helper_path = format!("{}_helpers.c", output);
        self.save_ir(&ir_path)?;
        fs::write(&helper_path, PRINT_HELPERS_C)?;

        println!("Compiling to executable...");
        let status = Command::new("clang")
            .arg(&ir_path)
            .arg(&helper_path)
            .arg("-o")
            .arg(output)
            .status();

        let _ = fs::remove_file(&ir_path);
        let _ = fs::remove_file(&helper_path);

        match status {
            Ok(s) if s.success() => {
                println!("Executable created: {}", output);
                Ok(())
            }
            Ok(_) => Err(TopError::tooling("Failed to compile executable")),
            Err(_) => Err(TopError::tooling(
                "'clang' not found in PATH; install LLVM to compile executables",
            )),
        }
    }

    /// Run the module through the external IR interpreter, then reset the
    /// module so further code can be generated.
    pub fn execute(&mut self) -> TopResult<()> {
        let ir_path = "temp_program.ll";
        self.save_ir(ir_path)?;

        let result = Self::execute_ir_file(Path::new(ir_path));

        let _ = fs::remove_file(ir_path);
        self.reset();
        result
    }

    /// Execute an IR file with `lli`, linking in the print helpers.
    pub fn execute_ir_file(path: &Path) -> TopResult<()> {
        fs::write("print_helpers.c", PRINT_HELPERS_C)?;

        let compiled = Command::new("clang")
            .arg("-c")
            .arg("print_helpers.c")
            .arg("-o")
            .arg("print_helpers.o")
            .status();
        if !matches!(&compiled, Ok(s) if s.success()) {
            let _ = fs::remove_file("print_helpers.c");
            return Err(TopError::tooling("Failed to compile helper functions"));
        }

        let status = Command::new("lli")
            .arg("--extra-object=print_helpers.o")
            .arg(path)
            .status();

        let _ = fs::remove_file("print_helpers.c");
        let _ = fs::remove_file("print_helpers.o");

        match status {
            Ok(s) if s.success() => Ok(()),
            Ok(_) => Err(TopError::tooling("Failed to execute program")),
            Err(_) => Err(TopError::tooling(
                "'lli' not found in PATH; install LLVM to execute programs",
            )),
        }
    }

    fn reset(&mut self) {
        self.functions_ir.clear();
        self.strings.clear();
        self.functions.clear();
        self.named_values.clear();
        self.entry_allocas.clear();
        self.body.clear();
        self.reg_count = 0;
        self.label_count = 0;
        self.slot_count = 0;
        self.terminated = false;
        self.in_function = false;
        self.errors.clear();
    }

    fn register_functions(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            match stmt {
                Stmt::Function(func) => {
                    self.functions.insert(func.name.clone(), func.params.len());
                    self.register_functions(&func.body.statements);
                }
                Stmt::If {
                    then_block,
                    else_block,
                    ..
                } => {
                    self.register_functions(&then_block.statements);
                    if let Some(block) = else_block {
                        self.register_functions(&block.statements);
                    }
                }
                Stmt::While { body, .. } => self.register_functions(&body.statements),
                Stmt::Block(block) => self.register_functions(&block.statements),
                _ => {}
            }
        }
    }

    fn compile_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.compile_stmt(stmt);
        }
    }

    fn compile_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { name, init, .. } => {
                let value = self.compile_expr(init);
                if let Some(value) = self.as_double(value) {
                    let slot = self.alloc_slot(name);
                    self.emit(&format!("  store double {}, double* {}", value, slot));
                    self.named_values.insert(name.clone(), slot);
                }
            }
            Stmt::Function(func) => self.compile_function(func),
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                let cond = match self
                    .compile_expr(condition)
                    .and_then(|value| self.as_branch_condition(value))
                {
                    Some(cond) => cond,
                    None => return,
                };

                let n = self.next_label();
                self.cond_br(&cond, &format!("then{}", n), &format!("else{}", n));

                self.emit_label(&format!("then{}", n));
                self.compile_block(then_block);
                if !self.terminated {
                    self.br(&format!("ifcont{}", n));
                }

                // The else block is emitted even when absent; it just falls
                // through to the merge point.
                self.emit_label(&format!("else{}", n));
                if let Some(block) = else_block {
                    self.compile_block(block);
                }
                if !self.terminated {
                    self.br(&format!("ifcont{}", n));
                }

                self.emit_label(&format!("ifcont{}", n));
            }
            Stmt::While { condition, body } => {
                let n = self.next_label();
                self.br(&format!("loopcond{}", n));
                self.emit_label(&format!("loopcond{}", n));

                match self
                    .compile_expr(condition)
                    .and_then(|value| self.as_branch_condition(value))
                {
                    Some(cond) => {
                        self.cond_br(&cond, &format!("loop{}", n), &format!("afterloop{}", n));
                        self.emit_label(&format!("loop{}", n));
                        self.compile_block(body);
                        if !self.terminated {
                            self.br(&format!("loopcond{}", n));
                        }
                    }
                    None => self.br(&format!("afterloop{}", n)),
                }

                self.emit_label(&format!("afterloop{}", n));
            }
            Stmt::Print(expr) => match self.compile_expr(expr) {
                Some((value, ty)) if ty == "i8*" => {
                    self.emit(&format!("  call void @printString(i8* {})", value));
                }
                Some(value) => {
                    if let Some(value) = self.as_double(Some(value)) {
                        self.emit(&format!("  call void @printDouble(double {})", value));
                    }
                }
                None => {}
            },
            Stmt::Return(expr) => {
                if !self.in_function {
                    self.diag("Return outside of a function");
                    return;
                }
                let value = match expr {
                    Some(expr) => {
                        let value = self.compile_expr(expr);
                        self.as_double(value)
                    }
                    None => Some(fmt_f64(0.0)),
                };
                if let Some(value) = value {
                    self.emit(&format!("  ret double {}", value));
                    self.terminated = true;
                    // Park the cursor in a fresh block so any statements
                    // after the return still land in well-formed text.
                    let n = self.next_label();
                    self.emit_label(&format!("afterret{}", n));
                }
            }
            Stmt::Block(block) => self.compile_block(block),
            Stmt::Expr(expr) => {
                self.compile_expr(expr);
            }
        }
    }

    fn compile_function(&mut self, func: &Function) {
        let saved_values = std::mem::take(&mut self.named_values);
        let saved_allocas = std::mem::take(&mut self.entry_allocas);
        let saved_body = std::mem::take(&mut self.body);
        let saved_reg = self.reg_count;
        let saved_label = self.label_count;
        let saved_slot = self.slot_count;
        let saved_terminated = self.terminated;
        let saved_in_function = self.in_function;
        self.reg_count = 0;
        self.label_count = 0;
        self.slot_count = 0;
        self.terminated = false;
        self.in_function = true;

        // Parameters are spilled to entry-block slots so the body can
        // treat them like any other variable.
        for (i, param) in func.params.iter().enumerate() {
            let slot = self.alloc_slot(param);
            self.emit(&format!("  store double %arg{}, double* {}", i, slot));
            self.named_values.insert(param.clone(), slot);
        }

        self.compile_block(&func.body);

        if !self.terminated {
            self.emit(&format!("  ret double {}", fmt_f64(0.0)));
        }

        let params = (0..func.params.len())
            .map(|i| format!("double %arg{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let mut ir = format!("define double @{}({}) {{\nentry:\n", func.name, params);
        for alloca in &self.entry_allocas {
            ir.push_str(alloca);
            ir.push('\n');
        }
        ir.push_str(&self.body);
        ir.push_str("}\n");
        self.functions_ir.push(ir);

        self.named_values = saved_values;
        self.entry_allocas = saved_allocas;
        self.body = saved_body;
        self.reg_count = saved_reg;
        self.label_count = saved_label;
        self.slot_count = saved_slot;
        self.terminated = saved_terminated;
        self.in_function = saved_in_function;
    }

    /// Lower an expression. Returns `(value, type)` where type is one of
    /// `double`, `i1`, or `i8*`, or `None` after a diagnostic; consumers
    /// skip their own emission when an operand errored.
    fn compile_expr(&mut self, expr: &Expr) -> Option<(String, String)> {
        match expr {
            Expr::Number(value) => Some((fmt_f64(*value), "double".to_string())),
            Expr::String(contents) => {
                let global = self.intern_string(contents);
                let len = contents.len() + 1;
                let reg = self.next_reg();
                self.emit(&format!(
                    "  {} = getelementptr inbounds [{} x i8], [{} x i8]* {}, i64 0, i64 0",
                    reg, len, len, global
                ));
                Some((reg, "i8*".to_string()))
            }
            Expr::Identifier(name) => {
                let slot = match self.named_values.get(name) {
                    Some(slot) => slot.clone(),
                    None => {
                        self.diag(format!("Unknown variable: {}", name));
                        return None;
                    }
                };
                let reg = self.next_reg();
                self.emit(&format!("  {} = load double, double* {}", reg, slot));
                Some((reg, "double".to_string()))
            }
            Expr::Binary {
                op: BinaryOp::Assign,
                left,
                right,
            } => {
                let name = match left.as_ref() {
                    Expr::Identifier(name) => name.clone(),
                    _ => {
                        self.diag("Left side of assignment must be a variable");
                        return None;
                    }
                };
                let value = self.compile_expr(right);
                let value = self.as_double(value)?;
                let slot = match self.named_values.get(&name) {
                    Some(slot) => slot.clone(),
                    None => {
                        self.diag(format!("Unknown variable: {}", name));
                        return None;
                    }
                };
                self.emit(&format!("  store double {}, double* {}", value, slot));
                Some((value, "double".to_string()))
            }
            Expr::Binary { op, left, right } => {
                let lhs = self.compile_expr(left);
                let lhs = self.as_double(lhs)?;
                let rhs = self.compile_expr(right);
                let rhs = self.as_double(rhs)?;

                let (inst, ty) = match op {
                    BinaryOp::Add => ("fadd double", "double"),
                    BinaryOp::Sub => ("fsub double", "double"),
                    BinaryOp::Mul => ("fmul double", "double"),
                    BinaryOp::Div => ("fdiv double", "double"),
                    BinaryOp::Eq => ("fcmp oeq double", "i1"),
                    BinaryOp::NotEq => ("fcmp one double", "i1"),
                    BinaryOp::Gt => ("fcmp ogt double", "i1"),
                    BinaryOp::Lt => ("fcmp olt double", "i1"),
                    BinaryOp::Assign => unreachable!(),
                };
                let reg = self.next_reg();
                self.emit(&format!("  {} = {} {}, {}", reg, inst, lhs, rhs));
                Some((reg, ty.to_string()))
            }
            Expr::Call { callee, args } => {
                let arity = match self.functions.get(callee) {
                    Some(arity) => *arity,
                    None => {
                        self.diag(format!("Unknown function: {}", callee));
                        return None;
                    }
                };
                if arity != args.len() {
                    self.diag(format!(
                        "Incorrect number of arguments for function {}",
                        callee
                    ));
                    return None;
                }

                let mut values = Vec::new();
                for arg in args {
                    let value = self.compile_expr(arg);
                    values.push(self.as_double(value)?);
                }

                let reg = self.next_reg();
                let arg_list = values
                    .iter()
                    .map(|value| format!("double {}", value))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.emit(&format!("  {} = call double @{}({})", reg, callee, arg_list));
                Some((reg, "double".to_string()))
            }
        }
    }

    /// Widen a value to `double` where a float is required. Comparison
    /// results get a `uitofp`; strings are diagnosed.
    fn as_double(&mut self, value: Option<(String, String)>) -> Option<String> {
        let (value, ty) = value?;
        match ty.as_str() {
            "i1" => {
                let reg = self.next_reg();
                self.emit(&format!("  {} = uitofp i1 {} to double", reg, value));
                Some(reg)
            }
            "i8*" => {
                self.diag("Cannot use a string as a number");
                None
            }
            _ => Some(value),
        }
    }

    /// Produce an `i1` for a branch. A comparison result passes through
    /// untouched; anything else is compared against 0.0 exactly once.
    fn as_branch_condition(&mut self, value: (String, String)) -> Option<String> {
        if value.1 == "i1" {
            return Some(value.0);
        }
        let value = self.as_double(Some(value))?;
        let reg = self.next_reg();
        self.emit(&format!(
            "  {} = fcmp one double {}, {}",
            reg,
            value,
            fmt_f64(0.0)
        ));
        Some(reg)
    }

    fn intern_string(&mut self, contents: &str) -> String {
        if let Some((_, name)) = self.strings.iter().find(|(c, _)| c == contents) {
            return name.clone();
        }
        let name = format!("@.str.{}", self.strings.len());
        self.strings.push((contents.to_string(), name.clone()));
        name
    }

    fn alloc_slot(&mut self, name: &str) -> String {
        let slot = format!("%{}.addr{}", name, self.slot_count);
        self.slot_count += 1;
        self.entry_allocas.push(format!("  {} = alloca double", slot));
        slot
    }

    fn emit(&mut self, line: &str) {
        self.body.push_str(line);
        self.body.push('\n');
    }

    fn emit_label(&mut self, label: &str) {
        self.body.push_str(label);
        self.body.push_str(":\n");
        self.terminated = false;
    }

    fn br(&mut self, label: &str) {
        self.emit(&format!("  br label %{}", label));
        self.terminated = true;
    }

    fn cond_br(&mut self, cond: &str, then_label: &str, else_label: &str) {
        self.emit(&format!(
            "  br i1 {}, label %{}, label %{}",
            cond, then_label, else_label
        ));
        self.terminated = true;
    }

    fn next_reg(&mut self) -> String {
        let reg = format!("%{}", self.reg_count);
        self.reg_count += 1;
        reg
    }

    fn next_label(&mut self) -> usize {
        let n = self.label_count;
        self.label_count += 1;
        n
    }

    fn diag(&mut self, message: impl Into<String>) {
        let message = message.into();
        eprintln!("{}", message);
        self.errors.push(message);
    }
}

/// LLVM doubles in hex bit form; every `f64` round-trips exactly.
fn fmt_f64(value: f64) -> String {
    format!("0x{:016X}", value.to_bits())
}

fn escape_string(contents: &str) -> String {
    let mut escaped = String::new();
    for byte in contents.bytes() {
        if (32..127).contains(&byte) && byte != b'"' && byte != b'\\' {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("\\{:02X}", byte));
        }
    }
    escaped.push_str("\\00");
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn gen_for(source: &str) -> CodeGenerator {
        let tokens = Lexer::new(source).tokenize();
        let mut parser = Parser::new(&tokens);
        let program = parser.parse();
        assert!(
            parser.errors().is_empty(),
            "unexpected parse errors: {:?}",
            parser.errors()
        );
        let mut gen = CodeGenerator::new();
        gen.compile_program(&program);
        gen
    }

    fn ir_for(source: &str) -> String {
        let gen = gen_for(source);
        assert!(gen.errors().is_empty(), "unexpected diagnostics: {:?}", gen.errors());
        gen.module_ir()
    }

    #[test]
    fn arithmetic_and_print() {
        let ir = ir_for("var x is 40 plus 2\nprint x");
        assert!(ir.contains(&format!(
            "fadd double {}, {}",
            fmt_f64(40.0),
            fmt_f64(2.0)
        )));
        assert!(ir.contains("%x.addr0 = alloca double"));
        assert!(ir.contains("store double %0, double* %x.addr0"));
        assert!(ir.contains("call void @printDouble(double %1)"));
    }

    #[test]
    fn declared_externs_are_present() {
        let ir = ir_for("print 1");
        assert!(ir.contains("declare void @printDouble(double)"));
        assert!(ir.contains("declare void @printString(i8*)"));
    }

    #[test]
    fn comparison_drives_branch_without_rewrap() {
        let ir = ir_for("var x is 5\nif x greater than 3 { print 1 } else { print 0 }");
        assert!(ir.contains("fcmp ogt double"));
        assert_eq!(ir.matches("fcmp").count(), 1);
        assert!(!ir.contains("uitofp"));
        assert!(ir.contains("br i1 %1, label %then0, label %else0"));
        assert!(ir.contains("then0:"));
        assert!(ir.contains("else0:"));
        assert!(ir.contains("ifcont0:"));
    }

    #[test]
    fn numeric_condition_is_coerced_exactly_once() {
        let ir = ir_for("var x is 1\nif x { print 1 }");
        assert!(ir.contains(&format!("%1 = fcmp one double %0, {}", fmt_f64(0.0))));
        assert_eq!(ir.matches("fcmp").count(), 1);
    }

    #[test]
    fn if_without_else_still_emits_else_block() {
        let ir = ir_for("var x is 1\nif x { print 1 }");
        let else_pos = ir.find("else0:").expect("missing else block");
        let merge_pos = ir.find("ifcont0:").expect("missing merge block");
        assert!(else_pos < merge_pos);
    }

    #[test]
    fn while_loop_structure() {
        let ir = ir_for("var i is 0\nwhile i less than 3 { print i\n i is i plus 1 }");
        assert!(ir.contains("fcmp olt double"));
        assert!(ir.contains("br i1"));
        assert!(ir.contains("loopcond0:"));
        assert!(ir.contains("loop0:"));
        assert!(ir.contains("afterloop0:"));
        // One branch enters the condition block, one loops back to it.
        assert_eq!(ir.matches("br label %loopcond0").count(), 2);
    }

    #[test]
    fn function_definition_and_call() {
        let ir = ir_for("function add(a, b) { return a plus b }\nprint add(2, 3)");
        assert!(ir.contains("define double @add(double %arg0, double %arg1) {"));
        assert!(ir.contains("store double %arg0, double* %a.addr0"));
        assert!(ir.contains("store double %arg1, double* %b.addr1"));
        assert!(ir.contains(&format!(
            "call double @add(double {}, double {})",
            fmt_f64(2.0),
            fmt_f64(3.0)
        )));
        assert!(ir.contains("define i32 @main() {"));
    }

    #[test]
    fn call_may_precede_definition() {
        let ir = ir_for("print double_it(4)\nfunction double_it(n) { return n times 2 }");
        assert!(ir.contains("call double @double_it"));
        assert!(ir.contains("define double @double_it(double %arg0) {"));
    }

    #[test]
    fn string_print_goes_through_global() {
        let ir = ir_for("print \"hello\"");
        assert!(ir.contains(
            "@.str.0 = private unnamed_addr constant [6 x i8] c\"hello\\00\", align 1"
        ));
        assert!(ir.contains(
            "getelementptr inbounds [6 x i8], [6 x i8]* @.str.0, i64 0, i64 0"
        ));
        assert!(ir.contains("call void @printString(i8* %0)"));
    }

    #[test]
    fn identical_strings_share_one_global() {
        let ir = ir_for("print \"hi\"\nprint \"hi\"");
        assert_eq!(ir.matches("@.str.0 =").count(), 1);
        assert!(!ir.contains("@.str.1"));
    }

    #[test]
    fn equality_comparison_drives_branch() {
        let ir = ir_for("var x is 1\nif x equals 1 { print \"yes\" }");
        assert!(ir.contains("fcmp oeq double"));
        assert_eq!(ir.matches("fcmp").count(), 1);
        assert!(!ir.contains("uitofp"));
    }

    #[test]
    fn comparison_stored_in_variable_is_widened() {
        let ir = ir_for("var a is 1\nvar b is 2\nvar y is a greater than b");
        assert!(ir.contains("fcmp ogt double"));
        assert!(ir.contains("uitofp i1"));
        assert!(ir.contains("store double %3, double* %y.addr2"));
    }

    #[test]
    fn function_without_return_yields_zero() {
        let ir = ir_for("function noop() { print 1 }");
        assert!(ir.contains(&format!("ret double {}", fmt_f64(0.0))));
    }

    #[test]
    fn code_after_return_lands_in_dead_block() {
        let ir = ir_for("function f() { return 1\nprint 2 }");
        assert!(ir.contains(&format!("ret double {}", fmt_f64(1.0))));
        assert!(ir.contains("afterret0:"));
        // The dead block is itself terminated by the fallback return.
        assert_eq!(ir.matches("ret double").count(), 2);
    }

    #[test]
    fn allocas_are_hoisted_to_entry() {
        let ir = ir_for("var i is 0\nwhile i less than 2 { var j is i\n i is i plus 1 }");
        let alloca_pos = ir.find("%j.addr1 = alloca double").expect("missing alloca");
        let loop_pos = ir.find("loopcond0:").expect("missing loop");
        assert!(alloca_pos < loop_pos);
    }

    #[test]
    fn nested_functions_are_hoisted() {
        let ir = ir_for("function outer() { function inner() { return 1 }\nreturn inner() }");
        assert!(ir.contains("define double @inner() {"));
        assert!(ir.contains("define double @outer() {"));
        assert!(ir.contains("call double @inner()"));
    }

    #[test]
    fn unknown_variable_diagnostic() {
        let gen = gen_for("print y");
        assert!(gen.errors().contains(&"Unknown variable: y".to_string()));
        assert!(!gen.module_ir().contains("call void @printDouble"));
    }

    #[test]
    fn unknown_function_diagnostic() {
        let gen = gen_for("print f(1)");
        assert!(gen.errors().contains(&"Unknown function: f".to_string()));
    }

    #[test]
    fn arity_mismatch_diagnostic() {
        let gen = gen_for("function add(a, b) { return a plus b }\nprint add(1)");
        assert!(gen
            .errors()
            .contains(&"Incorrect number of arguments for function add".to_string()));
    }

    #[test]
    fn assignment_to_non_identifier_diagnostic() {
        let gen = gen_for("var a is 1\n3 is a");
        assert!(gen
            .errors()
            .contains(&"Left side of assignment must be a variable".to_string()));
    }

    #[test]
    fn return_at_top_level_diagnostic() {
        let gen = gen_for("return 5");
        assert!(gen
            .errors()
            .contains(&"Return outside of a function".to_string()));
        // main still closes cleanly.
        assert!(gen.module_ir().contains("ret i32 0"));
    }

    #[test]
    fn string_in_arithmetic_diagnostic() {
        let gen = gen_for("var x is \"hi\" plus 1");
        assert!(gen
            .errors()
            .contains(&"Cannot use a string as a number".to_string()));
    }

    #[test]
    fn functions_see_only_their_own_scope() {
        let gen = gen_for("var x is 5\nfunction f() { print x }");
        assert!(gen.errors().contains(&"Unknown variable: x".to_string()));
    }

    #[test]
    fn emission_is_deterministic() {
        let source = "var x is 1\nfunction add(a, b) { return a plus b }\n\
                      while x less than 5 { x is add(x, 1) }\nprint \"done\"\nprint x";
        assert_eq!(ir_for(source), ir_for(source));
    }

    #[test]
    fn fmt_f64_round_trips() {
        assert_eq!(fmt_f64(0.0), "0x0000000000000000");
        assert_eq!(fmt_f64(42.0), format!("0x{:016X}", 42.0f64.to_bits()));
    }

    #[test]
    fn escape_string_handles_specials() {
        assert_eq!(escape_string("hi"), "hi\\00");
        assert_eq!(escape_string("a\"b"), "a\\22b\\00");
        assert_eq!(escape_string("a\nb"), "a\\0Ab\\00");
    }
}
