//! Value kinds and framing conventions.
//!
//! Every byte buffer crossing the connection is interpreted as one of a
//! closed set of [`Kind`]s. The server never sends type information, so
//! both sides must agree on the kind out of band (usually the signature
//! of the remote method).

use std::fmt;
use std::str::FromStr;

use crate::CodecError;

/// Width of the short fixed-string kind, in bytes.
pub const STR32_WIDTH: usize = 32;

/// Width of the long fixed-string kind, in bytes. Database keys use it.
pub const STR512_WIDTH: usize = 512;

/// Size of the little-endian length prefix used by generic framing.
pub const LENGTH_PREFIX: usize = 8;

/// The kind of a value on the wire.
///
/// Adding a kind here forces every `match` over it to be revisited, which
/// is exactly where encode/decode/unpack need new arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    /// NUL-terminated UTF-8 in a zero-padded 32-byte slot.
    Str32,
    /// NUL-terminated UTF-8 in a zero-padded 512-byte slot.
    Str512,
    /// Opaque bytes. Variable width.
    ByteArray,
    /// A run of `Str512` slots. Variable width.
    StringArray,
}

impl Kind {
    /// Fixed byte width of one element, or `None` for variable-width kinds.
    pub fn width(self) -> Option<usize> {
        match self {
            Kind::U8 | Kind::I8 | Kind::Bool => Some(1),
            Kind::U16 | Kind::I16 => Some(2),
            Kind::U32 | Kind::I32 | Kind::F32 => Some(4),
            Kind::U64 | Kind::I64 | Kind::F64 => Some(8),
            Kind::Str32 => Some(STR32_WIDTH),
            Kind::Str512 => Some(STR512_WIDTH),
            Kind::ByteArray | Kind::StringArray => None,
        }
    }

    /// `true` for the integer, float and bool kinds.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Kind::U8
                | Kind::U16
                | Kind::U32
                | Kind::U64
                | Kind::I8
                | Kind::I16
                | Kind::I32
                | Kind::I64
                | Kind::F32
                | Kind::F64
                | Kind::Bool
        )
    }

    /// The tag the dashboard uses for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::U8 => "uint8",
            Kind::U16 => "uint16",
            Kind::U32 => "uint32",
            Kind::U64 => "uint64",
            Kind::I8 => "int8",
            Kind::I16 => "int16",
            Kind::I32 => "int32",
            Kind::I64 => "int64",
            Kind::F32 => "float32",
            Kind::F64 => "float64",
            Kind::Bool => "bool",
            Kind::Str32 => "str32",
            Kind::Str512 => "str512",
            Kind::ByteArray => "bytearray",
            Kind::StringArray => "stringarray",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "uint8" => Kind::U8,
            "uint16" => Kind::U16,
            "uint32" => Kind::U32,
            "uint64" => Kind::U64,
            "int8" => Kind::I8,
            "int16" => Kind::I16,
            "int32" => Kind::I32,
            "int64" => Kind::I64,
            "float32" => Kind::F32,
            "float64" => Kind::F64,
            "bool" => Kind::Bool,
            "str32" | "string32" => Kind::Str32,
            "str512" | "string512" | "string" => Kind::Str512,
            "bytearray" => Kind::ByteArray,
            "stringarray" => Kind::StringArray,
            other => return Err(CodecError::UnknownKind(other.to_string())),
        };
        Ok(kind)
    }
}

/// How a value's bytes are laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// The raw encoding, no metadata.
    #[default]
    Native,
    /// The raw encoding prefixed with its length as a little-endian `u64`.
    Generic,
}
