//! Two-pass assembly
//!
//! Pass 1 binds each label to the ROM address of the instruction after it.
//! Pass 2 encodes, allocating RAM from 16 for symbols that are not labels.

use crate::encoder::{comp_bits, dest_bits, encode_address, encode_compute, jump_bits, to_binary};
use crate::error::AssemblerError;
use crate::parser::{parse_source, Instruction, Operand, SourceLine};
use crate::symbols::SymbolTable;
use jack_compiler::log_error;
use std::fs;
use std::path::{Path, PathBuf};

pub const ROM_SIZE: usize = 32768;
pub const HACK_EXTENSION: &str = "hack";

#[derive(Debug, Clone)]
pub struct Assembly {
    pub words: Vec<u16>,
    pub symbols: SymbolTable,
    pub label_count: usize,
}

impl Assembly {
    /// One 16-character binary line per instruction
    pub fn to_hack_text(&self) -> String {
        self.words
            .iter()
            .map(|word| to_binary(*word) + "\n")
            .collect()
    }
}

pub fn assemble(text: &str) -> Result<Assembly, AssemblerError> {
    let result = parse_source(text).and_then(|lines| {
        let (symbols, label_count) = bind_labels(&lines)?;
        encode_all(&lines, symbols, label_count)
    });

    if let Err(err) = &result {
        log_error!(err.error_code(), &err.to_string(), "line" => err.line().unwrap_or(0));
    }
    result
}

fn bind_labels(lines: &[SourceLine]) -> Result<(SymbolTable, usize), AssemblerError> {
    let mut symbols = SymbolTable::new();
    let mut address = 0usize;
    let mut label_count = 0;

    for source in lines {
        match &source.instruction {
            Instruction::Label(name) => {
                let rom_address = u16::try_from(address)
                    .map_err(|_| AssemblerError::ProgramTooLarge { count: address })?;
                if !symbols.define(name, rom_address) {
                    return Err(AssemblerError::DuplicateLabel {
                        line: source.line,
                        label: name.clone(),
                    });
                }
                label_count += 1;
            }
            _ => address += 1,
        }
    }

    if address > ROM_SIZE {
        return Err(AssemblerError::ProgramTooLarge { count: address });
    }
    Ok((symbols, label_count))
}

fn encode_all(
    lines: &[SourceLine],
    mut symbols: SymbolTable,
    label_count: usize,
) -> Result<Assembly, AssemblerError> {
    let mut words = Vec::with_capacity(lines.len());

    for source in lines {
        let line = source.line;
        let word = match &source.instruction {
            Instruction::Label(_) => continue,
            Instruction::Address(Operand::Constant(value)) => encode_address(*value),
            Instruction::Address(Operand::Symbol(name)) => {
                encode_address(symbols.resolve_or_allocate(name))
            }
            Instruction::Compute { dest, comp, jump } => {
                let comp_code = comp_bits(comp).ok_or_else(|| AssemblerError::UnknownComp {
                    line,
                    mnemonic: comp.clone(),
                })?;
                let dest_code = match dest {
                    Some(dest) => dest_bits(dest).ok_or_else(|| AssemblerError::UnknownDest {
                        line,
                        mnemonic: dest.clone(),
                    })?,
                    None => 0,
                };
                let jump_code = match jump {
                    Some(jump) => jump_bits(jump).ok_or_else(|| AssemblerError::UnknownJump {
                        line,
                        mnemonic: jump.clone(),
                    })?,
                    None => 0,
                };
                encode_compute(comp_code, dest_code, jump_code)
            }
        };
        words.push(word);
    }

    log::debug!(
        "assembled {} instructions, {} labels, {} variables",
        words.len(),
        label_count,
        symbols.variable_count()
    );

    Ok(Assembly {
        words,
        symbols,
        label_count,
    })
}

/// Assemble `path` and write `<stem>.hack` beside it
pub fn assemble_file(path: &Path) -> Result<PathBuf, AssemblerError> {
    let io_error = |path: &Path, err: std::io::Error| AssemblerError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    };

    let text = fs::read_to_string(path).map_err(|err| io_error(path, err))?;
    let assembly = assemble(&text)?;
    let out = path.with_extension(HACK_EXTENSION);
    fs::write(&out, assembly.to_hack_text()).map_err(|err| io_error(&out, err))?;

    log::info!("{} -> {} ({} words)", path.display(), out.display(), assembly.words.len());
    Ok(out)
}
