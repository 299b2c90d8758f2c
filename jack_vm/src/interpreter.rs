//! Reference stack-machine interpreter
//!
//! Executes parsed commands directly against a 32K word RAM laid out the way
//! the translated assembly lays it out: pointer registers at 0..=4, `temp`
//! at 5..=12, statics from 16, the stack from 256 and a heap from 2048.
//! Call frames live in RAM exactly as translated code builds them; return
//! addresses are kept on a host-side stack since commands have no ROM address.
//!
//! The runtime library routines compiled code relies on are implemented on
//! the host. A function defined by the program always wins over a host
//! routine of the same name.

use crate::command::{ArithmeticOp, Command, Segment, TEMP_BASE};
use crate::logging::{codes, log_vm_debug, log_vm_error};
use crate::parser::{parse_program, VmParseError};
use jack_compiler::logging::Code;
use serde::Serialize;
use std::collections::HashMap;

pub const RAM_SIZE: usize = 32768;
pub const STACK_BASE: i16 = 256;
pub const HEAP_BASE: i16 = 2048;
/// First address past the heap (screen memory starts here)
pub const HEAP_END: i32 = 16384;
pub const STATIC_BASE: u16 = 16;
pub const STATIC_END: u16 = 256;
pub const DEFAULT_STEP_LIMIT: u64 = 10_000_000;
pub const DEFAULT_ENTRY: &str = "Main.main";

const SP: usize = 0;
const LCL: usize = 1;
const ARG: usize = 2;
const THIS: usize = 3;
const THAT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpreterError {
    #[error("{file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: VmParseError,
    },

    #[error("function '{name}' is defined twice")]
    DuplicateFunction { name: String },

    #[error("label '{label}' is not defined in '{function}'")]
    UnknownLabel { function: String, label: String },

    #[error("{file}: static segment exceeds RAM {}..{}", STATIC_BASE, STATIC_END)]
    StaticOverflow { file: String },

    #[error("entry function '{name}' not found")]
    MissingEntry { name: String },

    #[error("call to undefined function '{name}' in '{function}'")]
    UnknownFunction { function: String, name: String },

    #[error("'{name}' expects {expected} arguments, called with {actual}")]
    ArityMismatch {
        name: String,
        expected: u16,
        actual: u16,
    },

    #[error("execution exceeded {limit} steps")]
    StepLimitExceeded { limit: u64 },

    #[error("division by zero in '{function}'")]
    DivisionByZero { function: String },

    #[error("heap exhausted allocating {requested} words")]
    HeapExhausted { requested: i16 },

    #[error("address {address} out of range in '{function}'")]
    InvalidAddress { function: String, address: i32 },

    #[error("{routine}: {message}")]
    Fault { routine: String, message: String },
}

impl InterpreterError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::Parse { source, .. } => source.error_code(),
            Self::UnknownLabel { .. } => codes::UNKNOWN_LABEL,
            Self::MissingEntry { .. } | Self::UnknownFunction { .. } => codes::UNKNOWN_FUNCTION,
            Self::StepLimitExceeded { .. } => codes::STEP_LIMIT_EXCEEDED,
            Self::DuplicateFunction { .. } | Self::StaticOverflow { .. } => {
                codes::ILLEGAL_OPERATION
            }
            Self::ArityMismatch { .. }
            | Self::DivisionByZero { .. }
            | Self::HeapExhausted { .. }
            | Self::InvalidAddress { .. }
            | Self::Fault { .. } => codes::RUNTIME_FAULT,
        }
    }

    fn report(self) -> Self {
        log_vm_error(self.error_code(), &self.to_string(), &[]);
        self
    }
}

// ============================================================================
// LINKING
// ============================================================================

/// Runtime library routines executed on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRoutine {
    MathMultiply,
    MathDivide,
    MathAbs,
    MemoryAlloc,
    MemoryDeAlloc,
    ArrayNew,
    ArrayDispose,
    StringNew,
    StringAppendChar,
    StringLength,
    StringCharAt,
    OutputPrintInt,
    OutputPrintString,
    OutputPrintChar,
    OutputPrintln,
}

impl HostRoutine {
    pub const ALL: [HostRoutine; 15] = [
        Self::MathMultiply,
        Self::MathDivide,
        Self::MathAbs,
        Self::MemoryAlloc,
        Self::MemoryDeAlloc,
        Self::ArrayNew,
        Self::ArrayDispose,
        Self::StringNew,
        Self::StringAppendChar,
        Self::StringLength,
        Self::StringCharAt,
        Self::OutputPrintInt,
        Self::OutputPrintString,
        Self::OutputPrintChar,
        Self::OutputPrintln,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::MathMultiply => "Math.multiply",
            Self::MathDivide => "Math.divide",
            Self::MathAbs => "Math.abs",
            Self::MemoryAlloc => "Memory.alloc",
            Self::MemoryDeAlloc => "Memory.deAlloc",
            Self::ArrayNew => "Array.new",
            Self::ArrayDispose => "Array.dispose",
            Self::StringNew => "String.new",
            Self::StringAppendChar => "String.appendChar",
            Self::StringLength => "String.length",
            Self::StringCharAt => "String.charAt",
            Self::OutputPrintInt => "Output.printInt",
            Self::OutputPrintString => "Output.printString",
            Self::OutputPrintChar => "Output.printChar",
            Self::OutputPrintln => "Output.println",
        }
    }

    pub const fn arity(self) -> u16 {
        match self {
            Self::OutputPrintln => 0,
            Self::MathAbs
            | Self::MemoryAlloc
            | Self::MemoryDeAlloc
            | Self::ArrayNew
            | Self::ArrayDispose
            | Self::StringNew
            | Self::StringLength
            | Self::OutputPrintInt
            | Self::OutputPrintString
            | Self::OutputPrintChar => 1,
            Self::MathMultiply | Self::MathDivide | Self::StringAppendChar | Self::StringCharAt => 2,
        }
    }

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|routine| routine.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Constant(u16),
    /// temp, static and pointer resolve to one fixed address
    Fixed(usize),
    Based { register: usize, offset: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Function(usize),
    Host(HostRoutine),
    /// index into `Program::names`; only an error once executed
    Undefined(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Push(Location),
    Pop(Location),
    Arithmetic(ArithmeticOp),
    Nop,
    Jump(usize),
    JumpIfTrue(usize),
    Enter { n_locals: u16 },
    Call { target: Target, n_args: u16 },
    Return,
}

#[derive(Debug, Clone, Copy)]
struct Instruction {
    op: Op,
    /// index into `Program::names` of the enclosing function
    owner: usize,
}

/// Commands from one or more files, with labels, calls and statics resolved
#[derive(Debug, Clone)]
pub struct Program {
    instructions: Vec<Instruction>,
    functions: HashMap<String, usize>,
    names: Vec<String>,
}

impl Program {
    /// Parse and link `(file stem, text)` pairs
    pub fn from_sources<S: AsRef<str>>(sources: &[(S, S)]) -> Result<Self, InterpreterError> {
        let files = sources
            .iter()
            .map(|(file, text)| {
                parse_program(text.as_ref())
                    .map(|commands| (file.as_ref().to_string(), commands))
                    .map_err(|source| InterpreterError::Parse {
                        file: file.as_ref().to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::link(&files)
    }

    pub fn link(files: &[(String, Vec<Command>)]) -> Result<Self, InterpreterError> {
        let mut names = vec![String::from("<top level>")];
        let mut owners = Vec::new();
        let mut functions = HashMap::new();
        let mut labels: HashMap<(usize, &str), usize> = HashMap::new();

        // Pass 1: function entry points, label addresses, owners
        for (_, commands) in files {
            let mut owner = 0;
            for command in commands {
                let pc = owners.len();
                match command {
                    Command::Function { name, .. } => {
                        if functions.insert(name.clone(), pc).is_some() {
                            return Err(InterpreterError::DuplicateFunction { name: name.clone() }.report());
                        }
                        names.push(name.clone());
                        owner = names.len() - 1;
                    }
                    Command::Label(label) => {
                        labels.insert((owner, label.as_str()), pc);
                    }
                    _ => {}
                }
                owners.push(owner);
            }
        }

        // Pass 2: resolve operands
        let mut instructions = Vec::with_capacity(owners.len());
        let mut next_static = STATIC_BASE;
        for (file, commands) in files {
            let static_base = next_static;
            let used = commands
                .iter()
                .filter_map(|command| match command {
                    Command::Push(Segment::Static, i) | Command::Pop(Segment::Static, i) => Some(i.saturating_add(1)),
                    _ => None,
                })
                .max()
                .unwrap_or(0);
            next_static = static_base.saturating_add(used);
            if next_static > STATIC_END {
                return Err(InterpreterError::StaticOverflow { file: file.clone() }.report());
            }

            for command in commands {
                let owner = owners[instructions.len()];

                let op = match command {
                    Command::Push(segment, index) => Op::Push(locate(*segment, *index, static_base)),
                    Command::Pop(segment, index) => Op::Pop(locate(*segment, *index, static_base)),
                    Command::Arithmetic(op) => Op::Arithmetic(*op),
                    Command::Label(_) => Op::Nop,
                    Command::Goto(label) => Op::Jump(resolve_label(&labels, &names, owner, label)?),
                    Command::IfGoto(label) => {
                        Op::JumpIfTrue(resolve_label(&labels, &names, owner, label)?)
                    }
                    Command::Function { n_locals, .. } => Op::Enter { n_locals: *n_locals },
                    Command::Return => Op::Return,
                    Command::Call { name, n_args } => {
                        let target = match (functions.get(name), HostRoutine::lookup(name)) {
                            (Some(pc), _) => Target::Function(*pc),
                            (None, Some(routine)) => Target::Host(routine),
                            (None, None) => {
                                names.push(name.clone());
                                Target::Undefined(names.len() - 1)
                            }
                        };
                        Op::Call {
                            target,
                            n_args: *n_args,
                        }
                    }
                };
                instructions.push(Instruction { op, owner });
            }
        }

        log_vm_debug("Program linked", &[
            ("files", &files.len().to_string()),
            ("functions", &functions.len().to_string()),
            ("instructions", &instructions.len().to_string()),
        ]);

        Ok(Self {
            instructions,
            functions,
            names,
        })
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

fn resolve_label(
    labels: &HashMap<(usize, &str), usize>,
    names: &[String],
    owner: usize,
    label: &str,
) -> Result<usize, InterpreterError> {
    labels.get(&(owner, label)).copied().ok_or_else(|| {
        InterpreterError::UnknownLabel {
            function: names[owner].clone(),
            label: label.to_string(),
        }
        .report()
    })
}

fn locate(segment: Segment, index: u16, static_base: u16) -> Location {
    match segment {
        Segment::Constant => Location::Constant(index),
        Segment::Static => Location::Fixed((static_base + index) as usize),
        Segment::Temp => Location::Fixed((TEMP_BASE + index) as usize),
        Segment::Pointer => Location::Fixed(THIS + index as usize),
        Segment::Local => Location::Based { register: LCL, offset: index },
        Segment::Argument => Location::Based { register: ARG, offset: index },
        Segment::This => Location::Based { register: THIS, offset: index },
        Segment::That => Location::Based { register: THAT, offset: index },
    }
}

// ============================================================================
// EXECUTION
// ============================================================================

/// Observable result of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Execution {
    pub return_value: i16,
    pub output: String,
    pub steps: u64,
}

pub struct Interpreter<'p> {
    program: &'p Program,
    ram: Vec<i16>,
    pc: usize,
    returns: Vec<usize>,
    heap_next: i32,
    output: String,
    steps: u64,
    step_limit: u64,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            ram: vec![0; RAM_SIZE],
            pc: 0,
            returns: Vec::new(),
            heap_next: HEAP_BASE as i32,
            output: String::new(),
            steps: 0,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn ram(&self) -> &[i16] {
        &self.ram
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Run `entry` with no arguments until it returns
    pub fn run(&mut self, entry: &str) -> Result<Execution, InterpreterError> {
        let start = *self
            .program
            .functions
            .get(entry)
            .ok_or_else(|| InterpreterError::MissingEntry { name: entry.to_string() }.report())?;

        self.ram[SP] = STACK_BASE;
        self.push_frame(0)?;
        self.pc = start;

        loop {
            if self.steps >= self.step_limit {
                return Err(InterpreterError::StepLimitExceeded {
                    limit: self.step_limit,
                }
                .report());
            }
            self.steps += 1;

            if let Some(return_value) = self.step()? {
                log_vm_debug("Execution finished", &[
                    ("entry", entry),
                    ("steps", &self.steps.to_string()),
                ]);
                return Ok(Execution {
                    return_value,
                    output: self.output.clone(),
                    steps: self.steps,
                });
            }
        }
    }

    /// Execute one instruction; `Some` once the entry function returns
    fn step(&mut self) -> Result<Option<i16>, InterpreterError> {
        let instruction = match self.program.instructions.get(self.pc) {
            Some(instruction) => *instruction,
            None => {
                return Err(self.fault("execution", "ran past the last command"));
            }
        };
        let mut next = self.pc + 1;

        match instruction.op {
            Op::Push(location) => {
                let value = self.load(location)?;
                self.push(value)?;
            }
            Op::Pop(location) => {
                let value = self.pop()?;
                self.store(location, value)?;
            }
            Op::Arithmetic(op) => self.arithmetic(op)?,
            Op::Nop => {}
            Op::Jump(target) => next = target,
            Op::JumpIfTrue(target) => {
                if self.pop()? != 0 {
                    next = target;
                }
            }
            Op::Enter { n_locals } => {
                for _ in 0..n_locals {
                    self.push(0)?;
                }
            }
            Op::Call { target, n_args } => match target {
                Target::Function(entry) => {
                    self.push_frame(n_args)?;
                    self.returns.push(next);
                    next = entry;
                }
                Target::Host(routine) => self.call_host(routine, n_args)?,
                Target::Undefined(name) => {
                    return Err(InterpreterError::UnknownFunction {
                        function: self.program.names[instruction.owner].clone(),
                        name: self.program.names[name].clone(),
                    }
                    .report());
                }
            },
            Op::Return => {
                let value = self.return_from_frame()?;
                match self.returns.pop() {
                    Some(address) => next = address,
                    None => return Ok(Some(value)),
                }
            }
        }

        self.pc = next;
        Ok(None)
    }

    // === MEMORY ===

    fn read(&self, address: i32) -> Result<i16, InterpreterError> {
        usize::try_from(address)
            .ok()
            .and_then(|a| self.ram.get(a).copied())
            .ok_or_else(|| self.invalid_address(address))
    }

    fn write(&mut self, address: i32, value: i16) -> Result<(), InterpreterError> {
        match usize::try_from(address).ok().filter(|a| *a < RAM_SIZE) {
            Some(a) => {
                self.ram[a] = value;
                Ok(())
            }
            None => Err(self.invalid_address(address)),
        }
    }

    fn invalid_address(&self, address: i32) -> InterpreterError {
        InterpreterError::InvalidAddress {
            function: self.current_function().to_string(),
            address,
        }
        .report()
    }

    fn address_of(&self, location: Location) -> i32 {
        match location {
            Location::Constant(_) => -1,
            Location::Fixed(address) => address as i32,
            Location::Based { register, offset } => self.ram[register] as i32 + offset as i32,
        }
    }

    fn load(&self, location: Location) -> Result<i16, InterpreterError> {
        match location {
            Location::Constant(value) => Ok(value as i16),
            other => self.read(self.address_of(other)),
        }
    }

    fn store(&mut self, location: Location, value: i16) -> Result<(), InterpreterError> {
        let address = self.address_of(location);
        self.write(address, value)
    }

    fn push(&mut self, value: i16) -> Result<(), InterpreterError> {
        let sp = self.ram[SP] as i32;
        self.write(sp, value)?;
        self.ram[SP] = self.ram[SP].wrapping_add(1);
        Ok(())
    }

    fn pop(&mut self) -> Result<i16, InterpreterError> {
        self.ram[SP] = self.ram[SP].wrapping_sub(1);
        self.read(self.ram[SP] as i32)
    }

    fn arithmetic(&mut self, op: ArithmeticOp) -> Result<(), InterpreterError> {
        let y = self.pop()?;
        let result = match op {
            ArithmeticOp::Neg => y.wrapping_neg(),
            ArithmeticOp::Not => !y,
            binary => self.binary(binary, y)?,
        };
        self.push(result)
    }

    fn binary(&mut self, op: ArithmeticOp, y: i16) -> Result<i16, InterpreterError> {
        let x = self.pop()?;
        Ok(match op {
            ArithmeticOp::Add => x.wrapping_add(y),
            ArithmeticOp::Sub => x.wrapping_sub(y),
            ArithmeticOp::And => x & y,
            ArithmeticOp::Or => x | y,
            ArithmeticOp::Eq => truth(x == y),
            ArithmeticOp::Gt => truth(x > y),
            ArithmeticOp::Lt => truth(x < y),
            ArithmeticOp::Neg | ArithmeticOp::Not => y,
        })
    }

    // === CALLS ===

    /// Build a frame the way translated `call` does; the return slot holds 0
    fn push_frame(&mut self, n_args: u16) -> Result<(), InterpreterError> {
        self.push(0)?;
        for register in [LCL, ARG, THIS, THAT] {
            self.push(self.ram[register])?;
        }
        let sp = self.ram[SP];
        self.ram[ARG] = sp.wrapping_sub(5).wrapping_sub(n_args as i16);
        self.ram[LCL] = sp;
        Ok(())
    }

    fn return_from_frame(&mut self) -> Result<i16, InterpreterError> {
        let frame = self.ram[LCL] as i32;
        let value = self.pop()?;
        let arg = self.ram[ARG] as i32;
        self.write(arg, value)?;
        self.ram[SP] = (arg + 1) as i16;
        for (offset, register) in [(1, THAT), (2, THIS), (3, ARG), (4, LCL)] {
            self.ram[register] = self.read(frame - offset)?;
        }
        Ok(value)
    }

    fn call_host(&mut self, routine: HostRoutine, n_args: u16) -> Result<(), InterpreterError> {
        if n_args != routine.arity() {
            return Err(InterpreterError::ArityMismatch {
                name: routine.name().to_string(),
                expected: routine.arity(),
                actual: n_args,
            }
            .report());
        }

        let mut args = vec![0i16; n_args as usize];
        for slot in args.iter_mut().rev() {
            *slot = self.pop()?;
        }

        let result = match (routine, args.as_slice()) {
            (HostRoutine::MathMultiply, [x, y]) => x.wrapping_mul(*y),
            (HostRoutine::MathDivide, [x, y]) => {
                if *y == 0 {
                    return Err(InterpreterError::DivisionByZero {
                        function: self.current_function().to_string(),
                    }
                    .report());
                }
                x.wrapping_div(*y)
            }
            (HostRoutine::MathAbs, [x]) => x.wrapping_abs(),
            (HostRoutine::MemoryAlloc | HostRoutine::ArrayNew, [size]) => self.alloc(routine, *size)?,
            (HostRoutine::StringNew, [capacity]) => {
                let object = self.alloc(routine, capacity.wrapping_add(2))?;
                self.write(object as i32, 0)?;
                self.write(object as i32 + 1, *capacity)?;
                object
            }
            (HostRoutine::StringAppendChar, [string, c]) => {
                let length = self.read(*string as i32)?;
                let capacity = self.read(*string as i32 + 1)?;
                if length >= capacity {
                    return Err(self.fault(routine.name(), "string capacity exceeded"));
                }
                self.write(*string as i32 + 2 + length as i32, *c)?;
                self.write(*string as i32, length + 1)?;
                *string
            }
            (HostRoutine::StringLength, [string]) => self.read(*string as i32)?,
            (HostRoutine::StringCharAt, [string, index]) => {
                let length = self.read(*string as i32)?;
                if *index < 0 || *index >= length {
                    return Err(self.fault(routine.name(), "index out of bounds"));
                }
                self.read(*string as i32 + 2 + *index as i32)?
            }
            (HostRoutine::OutputPrintInt, [value]) => {
                self.output.push_str(&value.to_string());
                0
            }
            (HostRoutine::OutputPrintString, [string]) => {
                let text = self.read_string(*string)?;
                self.output.push_str(&text);
                0
            }
            (HostRoutine::OutputPrintChar, [c]) => {
                self.output.push(char_of(*c));
                0
            }
            (HostRoutine::OutputPrintln, []) => {
                self.output.push('\n');
                0
            }
            // deallocation is a no-op for the bump allocator
            (HostRoutine::MemoryDeAlloc | HostRoutine::ArrayDispose, [_]) => 0,
            _ => return Err(self.fault(routine.name(), "bad argument list")),
        };

        self.push(result)
    }

    fn alloc(&mut self, routine: HostRoutine, size: i16) -> Result<i16, InterpreterError> {
        if size < 0 {
            return Err(self.fault(routine.name(), "negative size"));
        }
        let object = self.heap_next;
        if object + size as i32 > HEAP_END {
            return Err(InterpreterError::HeapExhausted { requested: size }.report());
        }
        self.heap_next += size as i32;
        Ok(object as i16)
    }

    fn read_string(&self, string: i16) -> Result<String, InterpreterError> {
        let length = self.read(string as i32)?;
        (0..length as i32)
            .map(|i| self.read(string as i32 + 2 + i).map(char_of))
            .collect()
    }

    fn current_function(&self) -> &str {
        self.program
            .instructions
            .get(self.pc)
            .map(|instruction| self.program.names[instruction.owner].as_str())
            .unwrap_or("<top level>")
    }

    fn fault(&self, routine: &str, message: &str) -> InterpreterError {
        InterpreterError::Fault {
            routine: routine.to_string(),
            message: format!("{} (in '{}')", message, self.current_function()),
        }
        .report()
    }
}

fn truth(value: bool) -> i16 {
    if value {
        -1
    } else {
        0
    }
}

fn char_of(code: i16) -> char {
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Parse, link and run `entry` in one go
pub fn run_sources<S: AsRef<str>>(
    sources: &[(S, S)],
    entry: &str,
) -> Result<Execution, InterpreterError> {
    let program = Program::from_sources(sources)?;
    Interpreter::new(&program).run(entry)
}
