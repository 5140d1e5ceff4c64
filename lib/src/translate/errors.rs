use crate::jvm;
use std::fmt;
use std::io;
use thiserror::Error;

/// Failure while converting a class or one of its methods
#[derive(Debug, Error)]
pub enum Error {
    /// Decoder or reader could not interpret the input
    #[error("malformed bytecode: {0}")]
    MalformedBytecode(jvm::Error),

    /// Jump from the instruction at source offset `offset` does not land on an instruction
    #[error("branch at offset {offset} targets offset {target}, which is not an instruction")]
    InvalidBranchTarget { offset: usize, target: i64 },

    /// Instruction reference outside of the method (`from` is past the end for handlers)
    #[error("instruction {from} refers to missing instruction {to}")]
    InvalidReference { from: usize, to: usize },

    /// Displacement needed at target offset `offset` does not fit its field
    #[error("displacement {displacement} at offset {offset} does not fit in {bits} bits")]
    DisplacementOverflow {
        offset: usize,
        displacement: i64,
        bits: u8,
    },

    #[error("unsupported: {0}")]
    UnsupportedConstruct(String),

    #[error("failed to write output: {0}")]
    WriteFailure(#[from] io::Error),
}

/// Plain classification of an [`Error`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedBytecode,
    InvalidBranchTarget,
    DisplacementOverflow,
    UnsupportedConstruct,
    WriteFailure,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedBytecode(_) => ErrorKind::MalformedBytecode,
            Error::InvalidBranchTarget { .. } | Error::InvalidReference { .. } => {
                ErrorKind::InvalidBranchTarget
            }
            Error::DisplacementOverflow { .. } => ErrorKind::DisplacementOverflow,
            Error::UnsupportedConstruct(_) => ErrorKind::UnsupportedConstruct,
            Error::WriteFailure(_) => ErrorKind::WriteFailure,
        }
    }

    /// Whether the error must fail the whole class (as opposed to a single method)
    pub fn is_class_fatal(&self) -> bool {
        self.kind() == ErrorKind::WriteFailure
    }
}

impl From<jvm::Error> for Error {
    fn from(err: jvm::Error) -> Error {
        match err {
            jvm::Error::InvalidBranchTarget { offset, target } => {
                Error::InvalidBranchTarget { offset, target }
            }
            other => Error::MalformedBytecode(other),
        }
    }
}

/// Error along with where it happened
#[derive(Debug)]
pub struct Diagnostic {
    /// Binary name of the class (or the input description if the name could not be read)
    pub class: String,

    /// Name followed by descriptor, `None` for errors about the class as a whole
    pub method: Option<String>,

    pub error: Error,
}

impl Diagnostic {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(f, "{}.{}: {}", self.class, method, self.error),
            None => write!(f, "{}: {}", self.class, self.error),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reader_errors_keep_their_kind() {
        let branch: Error = jvm::Error::InvalidBranchTarget {
            offset: 3,
            target: 99,
        }
        .into();
        assert_eq!(branch.kind(), ErrorKind::InvalidBranchTarget);

        let opcode: Error = jvm::Error::UnknownOpcode {
            opcode: 0xcb,
            offset: 0,
        }
        .into();
        assert_eq!(opcode.kind(), ErrorKind::MalformedBytecode);
        assert!(!opcode.is_class_fatal());
    }

    #[test]
    fn diagnostic_display() {
        let diagnostic = Diagnostic {
            class: "com/example/Foo".to_string(),
            method: Some("run()V".to_string()),
            error: Error::UnsupportedConstruct("`jsr` subroutines".to_string()),
        };
        assert_eq!(
            diagnostic.to_string(),
            "com/example/Foo.run()V: unsupported: `jsr` subroutines"
        );
    }
}
