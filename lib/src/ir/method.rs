use crate::ir::{InsnRef, Instruction};
use crate::tiny::ClassId;
use crate::translate::Error;

/// Exception handler over a range of instructions
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Handler {
    /// First protected instruction (inclusive)
    pub start: InsnRef,

    /// End of the protected range (exclusive, may be one past the last instruction)
    pub end: InsnRef,

    /// First instruction of the handler
    pub handler: InsnRef,

    /// `None` catches everything
    pub catch_type: Option<ClassId>,
}

/// Linear IR of one method body
///
/// Position in `instructions` is what establishes fall-through, and every control-flow
/// reference is an `InsnRef` into `instructions`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct MethodBody {
    pub instructions: Vec<Instruction>,
    pub handlers: Vec<Handler>,
    pub max_stack: u16,
    pub max_locals: u16,
}

impl MethodBody {
    /// Check that every reference points at an instruction
    pub fn validate(&self) -> Result<(), Error> {
        let len = self.instructions.len();
        for (position, instruction) in self.instructions.iter().enumerate() {
            for target in instruction.targets() {
                if target.0 >= len {
                    return Err(Error::InvalidReference {
                        from: position,
                        to: target.0,
                    });
                }
            }
        }
        for handler in &self.handlers {
            let bad = if handler.start.0 >= len || handler.start > handler.end {
                Some(handler.start)
            } else if handler.end.0 > len {
                Some(handler.end)
            } else if handler.handler.0 >= len {
                Some(handler.handler)
            } else {
                None
            };
            if let Some(InsnRef(to)) = bad {
                return Err(Error::InvalidReference { from: len, to });
            }
        }
        Ok(())
    }

    /// Human readable listing: position, source line, instruction
    pub fn listing(&self) -> String {
        let mut listing = String::new();
        for (position, instruction) in self.instructions.iter().enumerate() {
            listing.push_str(&format!(
                "{:>5} (line {:>4}): {}\n",
                position, instruction.source_line, instruction
            ));
        }
        for handler in &self.handlers {
            let catch = match handler.catch_type {
                Some(ClassId(id)) => format!("class {}", id),
                None => "any".to_string(),
            };
            listing.push_str(&format!(
                "  handler [{}, {}) -> {} catches {}\n",
                handler.start, handler.end, handler.handler, catch
            ));
        }
        listing
    }
}
