//! Fatal error kinds.
//!
//! Every fault the engine can hit is fatal to the run: the loader and the
//! VM stop at the first violation and surface a tagged variant an embedder
//! can match on. There are no retries and no partial-failure semantics; the
//! only locally-recovered condition is recorder saturation, which is not an
//! error at all (the in-progress trace is silently discarded).

use std::fmt::{self, Display};

use strum::IntoStaticStr;

use crate::inst::InstKind;

/// Result type alias for engine operations that can hit a fatal fault.
pub type VmResult<T> = Result<T, VmError>;

/// Faults raised while turning source text into an executable program.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
pub enum LoadError {
    /// A token that is neither a known mnemonic nor a label definition.
    UnknownMnemonic {
        /// The offending token.
        token: String,
    },
    /// An operand-carrying mnemonic at the end of the token stream.
    MissingOperand {
        /// The mnemonic that needed an operand.
        mnemonic: &'static str,
    },
    /// An operand token that does not parse for its mnemonic.
    BadOperand {
        /// The mnemonic the operand belongs to.
        mnemonic: &'static str,
        /// The offending operand token.
        token: String,
    },
    /// A label definition whose stored name does not end in `:`.
    MalformedLabel {
        /// The stored label name.
        name: String,
    },
    /// The same label defined at two instruction indices.
    DuplicateLabel {
        /// The label name, without the trailing `:`.
        name: String,
    },
    /// A branch or push referencing a label that is never defined.
    UnresolvedLabel {
        /// The referenced label name.
        name: String,
    },
}

impl LoadError {
    /// Stable tag for this error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMnemonic { token } => write!(f, "unknown mnemonic {token:?}"),
            Self::MissingOperand { mnemonic } => write!(f, "`{mnemonic}` is missing its operand"),
            Self::BadOperand { mnemonic, token } => write!(f, "`{mnemonic}` cannot take operand {token:?}"),
            Self::MalformedLabel { name } => write!(f, "label {name:?} does not end in ':'"),
            Self::DuplicateLabel { name } => write!(f, "label {name:?} is defined more than once"),
            Self::UnresolvedLabel { name } => write!(f, "reference to undefined label {name:?}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Faults raised during execution.
///
/// Each variant corresponds to one invariant of the machine; hitting any of
/// them means the program (or the engine itself) is broken, so the driver
/// propagates them to the embedder unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum VmError {
    /// A pop, peek, dup, or drop reached below the bottom of the stack.
    StackUnderflow,
    /// A push exceeded the stack's fixed capacity.
    StackOverflow,
    /// `swap 0` would exchange the top of the stack with itself.
    SwapTop,
    /// The program counter left the instruction vector.
    PcOutOfBounds {
        /// The out-of-range program counter.
        pc: usize,
    },
    /// A guard instruction was fetched from the loaded program.
    ///
    /// Guards exist only inside recorded traces; the loader cannot produce
    /// them, so this indicates a hand-built program that breaks the contract.
    GuardOutsideTrace {
        /// Location of the offending instruction.
        pc: usize,
    },
    /// A control-flow instruction survived inside a recorded trace.
    ///
    /// Recording rewrites JZ and RET into guards and elides JUMP and LABEL;
    /// HALT aborts the recording outright. Replaying any of them means the
    /// recorder produced a malformed trace.
    UnexpectedInTrace {
        /// The instruction kind that should have been rewritten or elided.
        kind: InstKind,
    },
}

impl VmError {
    /// Stable tag for this error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

impl Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackUnderflow => f.write_str("operand stack underflow"),
            Self::StackOverflow => f.write_str("operand stack overflow"),
            Self::SwapTop => f.write_str("swap 0 would exchange the stack top with itself"),
            Self::PcOutOfBounds { pc } => write!(f, "program counter {pc} is outside the program"),
            Self::GuardOutsideTrace { pc } => {
                write!(f, "guard instruction in the loaded program at pc {pc}")
            }
            Self::UnexpectedInTrace { kind } => {
                write!(f, "{kind} instruction inside a recorded trace")
            }
        }
    }
}

impl std::error::Error for VmError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_variant_names() {
        assert_eq!(VmError::StackUnderflow.kind(), "StackUnderflow");
        assert_eq!(VmError::PcOutOfBounds { pc: 3 }.kind(), "PcOutOfBounds");
        let err = LoadError::DuplicateLabel { name: "x".to_owned() };
        assert_eq!(err.kind(), "DuplicateLabel");
    }

    #[test]
    fn display_includes_context() {
        let err = LoadError::UnresolvedLabel {
            name: ".missing".to_owned(),
        };
        assert_eq!(err.to_string(), "reference to undefined label \".missing\"");
        assert_eq!(
            VmError::PcOutOfBounds { pc: 17 }.to_string(),
            "program counter 17 is outside the program"
        );
    }
}
