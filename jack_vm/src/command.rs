//! Command model shared with the compiler, plus operand rules
//!
//! The compiler's codegen emits [`Command`] values; this crate reads the
//! same commands back from text and lowers or executes them.

pub use jack_compiler::codegen::command::{render, ArithmeticOp, Segment, VmCommand as Command};

/// Largest value a `push constant` can load
pub const MAX_CONSTANT: u16 = 32767;
/// `temp` maps to RAM 5..=12
pub const TEMP_BASE: u16 = 5;
pub const TEMP_SIZE: u16 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessViolation {
    PopConstant,
    IndexOutOfRange { segment: Segment, index: u16, max: u16 },
}

impl std::fmt::Display for AccessViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PopConstant => f.write_str("cannot pop into the constant segment"),
            Self::IndexOutOfRange {
                segment,
                index,
                max,
            } => write!(f, "{} index {} exceeds {}", segment, index, max),
        }
    }
}

/// Highest legal index for `segment`, `None` when unbounded
pub fn segment_limit(segment: Segment) -> Option<u16> {
    match segment {
        Segment::Pointer => Some(1),
        Segment::Temp => Some(TEMP_SIZE - 1),
        Segment::Constant => Some(MAX_CONSTANT),
        _ => None,
    }
}

/// Check a push or pop operand
pub fn check_access(segment: Segment, index: u16, is_pop: bool) -> Result<(), AccessViolation> {
    if is_pop && segment == Segment::Constant {
        return Err(AccessViolation::PopConstant);
    }
    match segment_limit(segment) {
        Some(max) if index > max => Err(AccessViolation::IndexOutOfRange {
            segment,
            index,
            max,
        }),
        _ => Ok(()),
    }
}

/// Operand check for any command; only push and pop carry one
pub fn check_command(command: &Command) -> Result<(), AccessViolation> {
    match command {
        Command::Push(segment, index) => check_access(*segment, *index, false),
        Command::Pop(segment, index) => check_access(*segment, *index, true),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_rules() {
        assert_eq!(check_access(Segment::Constant, 7, true), Err(AccessViolation::PopConstant));
        assert!(check_access(Segment::Constant, MAX_CONSTANT, false).is_ok());
        assert!(check_access(Segment::Pointer, 1, true).is_ok());
        assert_eq!(
            check_access(Segment::Pointer, 2, false),
            Err(AccessViolation::IndexOutOfRange {
                segment: Segment::Pointer,
                index: 2,
                max: 1
            })
        );
        assert!(check_access(Segment::Temp, 8, true).is_err());
        assert!(check_access(Segment::Local, 900, true).is_ok());
    }

    #[test]
    fn test_check_command_ignores_control_flow() {
        assert!(check_command(&Command::Label("LOOP".into())).is_ok());
        assert!(check_command(&Command::Pop(Segment::Constant, 0)).is_err());
    }
}
