//! Stack-machine commands to Hack assembly
//!
//! One [`Translator`] per `.vm` file: static symbols and comparison labels
//! are keyed by the file stem, branch labels by the enclosing function.
//! R13 and R14 are scratch registers for pop addressing and returns.

use crate::command::{check_command, AccessViolation, ArithmeticOp, Command, Segment, TEMP_BASE};
use crate::logging::{codes, log_vm_debug, log_vm_error};
use jack_compiler::logging::Code;

/// Saved in a call frame, in push order
const FRAME_REGISTERS: [&str; 4] = ["LCL", "ARG", "THIS", "THAT"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    #[error("{file}: {command}: {violation}")]
    IllegalAccess {
        file: String,
        command: String,
        violation: AccessViolation,
    },

    #[error("{file}: '{command}' outside of any function")]
    OutsideFunction { file: String, command: String },
}

impl TranslateError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::IllegalAccess { .. } => codes::INVALID_INDEX,
            Self::OutsideFunction { .. } => codes::ILLEGAL_OPERATION,
        }
    }
}

pub struct Translator {
    file_name: String,
    current_function: Option<String>,
    call_count: usize,
    compare_count: usize,
}

impl Translator {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            current_function: None,
            call_count: 0,
            compare_count: 0,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Translate a whole file, each command preceded by its text as a comment
    pub fn translate_program(&mut self, commands: &[Command]) -> Result<String, TranslateError> {
        let mut out = format!("// File: {}.vm\n", self.file_name);
        for command in commands {
            out.push_str("// ");
            out.push_str(&command.to_string());
            out.push('\n');
            for line in self.translate(command)? {
                out.push_str(&line);
                out.push('\n');
            }
        }

        log_vm_debug("File translated", &[
            ("file", &self.file_name),
            ("commands", &commands.len().to_string()),
            ("calls", &self.call_count.to_string()),
        ]);
        Ok(out)
    }

    pub fn translate(&mut self, command: &Command) -> Result<Vec<String>, TranslateError> {
        check_command(command).map_err(|violation| {
            self.report(TranslateError::IllegalAccess {
                file: self.file_name.clone(),
                command: command.to_string(),
                violation,
            })
        })?;

        let lines = match command {
            Command::Push(segment, index) => self.push(*segment, *index),
            Command::Pop(segment, index) => self.pop(*segment, *index),
            Command::Arithmetic(op) => self.arithmetic(*op),
            Command::Label(label) => vec![format!("({})", self.scoped(label, command)?)],
            Command::Goto(label) => vec![format!("@{}", self.scoped(label, command)?), "0;JMP".into()],
            Command::IfGoto(label) => {
                let target = self.scoped(label, command)?;
                let mut lines = pop_d();
                lines.extend([format!("@{}", target), "D;JNE".into()]);
                lines
            }
            Command::Function { name, n_locals } => {
                self.current_function = Some(name.clone());
                function_entry(name, *n_locals)
            }
            Command::Call { name, n_args } => self.call(name, *n_args),
            Command::Return => return_sequence(),
        };
        Ok(lines)
    }

    fn scoped(&self, label: &str, command: &Command) -> Result<String, TranslateError> {
        match &self.current_function {
            Some(function) => Ok(format!("{}${}", function, label)),
            None => Err(self.report(TranslateError::OutsideFunction {
                file: self.file_name.clone(),
                command: command.to_string(),
            })),
        }
    }

    fn report(&self, err: TranslateError) -> TranslateError {
        log_vm_error(err.error_code(), &err.to_string(), &[("file", &self.file_name)]);
        err
    }

    // === PUSH / POP ===

    fn push(&self, segment: Segment, index: u16) -> Vec<String> {
        let mut lines = match segment {
            Segment::Constant => vec![format!("@{}", index), "D=A".into()],
            Segment::Static => vec![format!("@{}.{}", self.file_name, index), "D=M".into()],
            Segment::Temp => vec![format!("@{}", TEMP_BASE + index), "D=M".into()],
            Segment::Pointer => vec![format!("@{}", pointer_register(index)), "D=M".into()],
            based => vec![
                format!("@{}", index),
                "D=A".into(),
                format!("@{}", base_register(based)),
                "A=D+M".into(),
                "D=M".into(),
            ],
        };
        lines.extend(push_d());
        lines
    }

    fn pop(&self, segment: Segment, index: u16) -> Vec<String> {
        let target = match segment {
            Segment::Static => format!("@{}.{}", self.file_name, index),
            Segment::Temp => format!("@{}", TEMP_BASE + index),
            Segment::Pointer => format!("@{}", pointer_register(index)),
            based => {
                let mut lines = vec![
                    format!("@{}", index),
                    "D=A".into(),
                    format!("@{}", base_register(based)),
                    "D=D+M".into(),
                    "@R13".into(),
                    "M=D".into(),
                ];
                lines.extend(pop_d());
                lines.extend(["@R13".into(), "A=M".into(), "M=D".into()]);
                return lines;
            }
        };
        let mut lines = pop_d();
        lines.extend([target, "M=D".into()]);
        lines
    }

    // === ARITHMETIC ===

    fn arithmetic(&mut self, op: ArithmeticOp) -> Vec<String> {
        match op {
            ArithmeticOp::Neg => unary("D=-M"),
            ArithmeticOp::Not => unary("D=!M"),
            ArithmeticOp::Add => binary("D=D+M"),
            ArithmeticOp::Sub => binary("D=M-D"),
            ArithmeticOp::And => binary("D=D&M"),
            ArithmeticOp::Or => binary("D=D|M"),
            ArithmeticOp::Eq => self.compare(op, "JEQ"),
            ArithmeticOp::Gt => self.compare(op, "JGT"),
            ArithmeticOp::Lt => self.compare(op, "JLT"),
        }
    }

    /// x op y with x below y; true is -1, false 0
    fn compare(&mut self, op: ArithmeticOp, jump: &str) -> Vec<String> {
        let n = self.compare_count;
        self.compare_count += 1;
        let if_true = format!("{}.if_{}${}", self.file_name, op, n);
        let after = format!("{}.after_{}${}", self.file_name, op, n);

        let mut lines = binary("D=M-D");
        // binary() ends with a push; rewind to keep x - y in D
        lines.truncate(lines.len() - push_d().len());
        lines.extend([
            format!("@{}", if_true),
            format!("D;{}", jump),
            "D=0".into(),
            format!("@{}", after),
            "0;JMP".into(),
            format!("({})", if_true),
            "D=-1".into(),
            format!("({})", after),
        ]);
        lines.extend(push_d());
        lines
    }

    // === FUNCTIONS ===

    fn call(&mut self, name: &str, n_args: u16) -> Vec<String> {
        let caller = self.current_function.as_deref().unwrap_or("bootstrap");
        let return_label = format!("{}.{}$ret.{}", self.file_name, caller, self.call_count);
        self.call_count += 1;

        let mut lines = vec![format!("@{}", return_label), "D=A".into()];
        lines.extend(push_d());
        for register in FRAME_REGISTERS {
            lines.extend([format!("@{}", register), "D=M".into()]);
            lines.extend(push_d());
        }
        lines.extend([
            // ARG = SP - 5 - nArgs
            "@5".into(),
            "D=A".into(),
            format!("@{}", n_args),
            "D=D+A".into(),
            "@SP".into(),
            "D=M-D".into(),
            "@ARG".into(),
            "M=D".into(),
            // LCL = SP
            "@SP".into(),
            "D=M".into(),
            "@LCL".into(),
            "M=D".into(),
            format!("@{}", name),
            "0;JMP".into(),
            format!("({})", return_label),
        ]);
        lines
    }
}

/// `SP=256`, then `call Sys.init 0`
pub fn bootstrap() -> String {
    let mut translator = Translator::new("Sys");
    let mut out = String::from("// Bootstrap\n@256\nD=A\n@SP\nM=D\n");
    for line in translator.call("Sys.init", 0) {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn function_entry(name: &str, n_locals: u16) -> Vec<String> {
    let mut lines = vec![format!("({})", name), "@SP".into(), "A=M".into()];
    for _ in 0..n_locals {
        lines.extend(["M=0".into(), "A=A+1".into()]);
    }
    lines.extend(["D=A".into(), "@SP".into(), "M=D".into()]);
    lines
}

fn return_sequence() -> Vec<String> {
    let mut lines: Vec<String> = [
        // frame = LCL in R13
        "@LCL", "D=M", "@R13", "M=D",
        // return address = *(frame - 5) in R14
        "@5", "D=A", "@R13", "A=M-D", "D=M", "@R14", "M=D",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    // *ARG = pop(); SP = ARG + 1
    lines.extend(pop_d());
    lines.extend(["@ARG", "A=M", "M=D", "D=A", "@SP", "M=D+1"].map(String::from));

    // THAT, THIS, ARG, LCL from frame - 1 .. frame - 4
    for (offset, register) in FRAME_REGISTERS.iter().rev().enumerate() {
        lines.extend(["@R13".to_string(), "A=M".to_string()]);
        lines.extend(std::iter::repeat("A=A-1".to_string()).take(offset + 1));
        lines.extend(["D=M".to_string(), format!("@{}", register), "M=D".to_string()]);
    }

    lines.extend(["@R14", "A=M", "0;JMP"].map(String::from));
    lines
}

fn base_register(segment: Segment) -> &'static str {
    match segment {
        Segment::Argument => "ARG",
        Segment::Local => "LCL",
        Segment::This => "THIS",
        _ => "THAT",
    }
}

fn pointer_register(index: u16) -> &'static str {
    if index == 0 {
        "THIS"
    } else {
        "THAT"
    }
}

fn push_d() -> Vec<String> {
    ["@SP", "A=M", "M=D", "@SP", "M=M+1"].map(String::from).to_vec()
}

fn pop_d() -> Vec<String> {
    ["@SP", "AM=M-1", "D=M"].map(String::from).to_vec()
}

/// Operate on the top of stack in place
fn unary(operation: &str) -> Vec<String> {
    ["@SP", "AM=M-1", operation].map(String::from).into_iter()
        .chain(push_d())
        .collect()
}

/// Pop y into D, address x in M, combine, push
fn binary(operation: &str) -> Vec<String> {
    let mut lines = pop_d();
    lines.extend(["@SP", "AM=M-1", operation].map(String::from));
    lines.extend(push_d());
    lines
}
