//! Declared argument layouts for remote calls.
//!
//! Call arguments are concatenated with no boundaries, so a wrong
//! argument count or width silently shifts every following argument on
//! the server. An [`ArgSchema`] states the ordered kinds a method takes
//! and rejects a mismatching argument list before it is sent.

use crate::kind::LENGTH_PREFIX;
use crate::{CodecError, Framing, Kind, TypedValue};

/// The ordered argument kinds of a remote method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSchema {
    kinds: Vec<Kind>,
}

impl ArgSchema {
    pub fn new(kinds: &[Kind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
        }
    }

    pub fn kinds(&self) -> &[Kind] {
        &self.kinds
    }

    /// Checks `args` against the schema.
    ///
    /// Fixed-width kinds must have exactly that many payload bytes.
    /// Variable-width kinds must be generic-framed so the server can find
    /// their end.
    pub fn check(&self, args: &[TypedValue]) -> Result<(), CodecError> {
        if args.len() != self.kinds.len() {
            return Err(CodecError::SchemaMismatch(format!(
                "expected {} arguments, got {}",
                self.kinds.len(),
                args.len()
            )));
        }

        for (index, (kind, arg)) in self.kinds.iter().zip(args).enumerate() {
            match kind.width() {
                Some(width) => {
                    let got = arg.payload().len();
                    if got != width {
                        return Err(CodecError::SchemaMismatch(format!(
                            "argument {index} ({kind}) is {got} bytes, expected {width}"
                        )));
                    }
                }
                None => {
                    if arg.framing() != Framing::Generic || arg.len() < LENGTH_PREFIX {
                        return Err(CodecError::SchemaMismatch(format!(
                            "argument {index} ({kind}) must be generic-framed"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
