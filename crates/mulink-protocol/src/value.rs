//! The typed codec: [`Value`]s in, [`TypedValue`] bytes out, and back.
//!
//! All multi-byte numbers are little-endian. Fixed-string kinds are
//! zero-padded slots holding NUL-terminated UTF-8. Generic framing puts
//! an 8-byte little-endian length in front of the native bytes.
//!
//! ```text
//! native  u32 7        → 07 00 00 00
//! generic u32 7        → 04 00 00 00 00 00 00 00 07 00 00 00
//! native  str32 "ab"   → 61 62 00 00 … 00            (32 bytes)
//! ```

use std::fmt;
use std::str::FromStr;

use crate::kind::{LENGTH_PREFIX, STR32_WIDTH, STR512_WIDTH};
use crate::{CodecError, Framing, Kind};

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A decoded application value.
///
/// Numeric and bool buffers holding more than one element decode to
/// [`Value::List`]; a single element decodes to the scalar variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    Strings(Vec<String>),
    List(Vec<Value>),
}

impl Value {
    /// Short name of the variant, used in mismatch diagnostics.
    fn variant_name(&self) -> &'static str {
        match self {
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Strings(_) => "strings",
            Value::List(_) => "list",
        }
    }

    /// Returns the string if this is a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the flag if this is a [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Widens any unsigned scalar to `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U8(v) => Some(u64::from(*v)),
            Value::U16(v) => Some(u64::from(*v)),
            Value::U32(v) => Some(u64::from(*v)),
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    /// Widens any signed scalar to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I8(v) => Some(i64::from(*v)),
            Value::I16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Widens either float kind to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(f64::from(*v)),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the bytes if this is a [`Value::Bytes`].
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Consumes the value, returning the strings of a [`Value::Strings`].
    pub fn into_strings(self) -> Option<Vec<String>> {
        match self {
            Value::Strings(v) => Some(v),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Strings(v) => write!(f, "{v:?}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TypedValue
// ---------------------------------------------------------------------------

/// A byte buffer ready for the wire, tagged with its framing.
///
/// The kind is not stored: the receiver has to know it. Use
/// [`TypedValue::decode`] (or [`TypedValue::astype`]) to read it back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypedValue {
    bytes: Vec<u8>,
    framing: Framing,
}

impl TypedValue {
    /// Wraps bytes that are already laid out according to `framing`.
    pub fn from_bytes(bytes: Vec<u8>, framing: Framing) -> Self {
        Self { bytes, framing }
    }

    /// Frames a native encoding, adding the length prefix when generic.
    fn frame(native: Vec<u8>, framing: Framing) -> Self {
        let bytes = match framing {
            Framing::Native => native,
            Framing::Generic => {
                let mut out = Vec::with_capacity(LENGTH_PREFIX + native.len());
                out.extend_from_slice(&(native.len() as u64).to_le_bytes());
                out.extend_from_slice(&native);
                out
            }
        };
        Self { bytes, framing }
    }

    pub fn u8(v: u8, framing: Framing) -> Self {
        Self::frame(vec![v], framing)
    }

    pub fn u16(v: u16, framing: Framing) -> Self {
        Self::frame(v.to_le_bytes().to_vec(), framing)
    }

    pub fn u32(v: u32, framing: Framing) -> Self {
        Self::frame(v.to_le_bytes().to_vec(), framing)
    }

    pub fn u64(v: u64, framing: Framing) -> Self {
        Self::frame(v.to_le_bytes().to_vec(), framing)
    }

    pub fn i8(v: i8, framing: Framing) -> Self {
        Self::frame(v.to_le_bytes().to_vec(), framing)
    }

    pub fn i16(v: i16, framing: Framing) -> Self {
        Self::frame(v.to_le_bytes().to_vec(), framing)
    }

    pub fn i32(v: i32, framing: Framing) -> Self {
        Self::frame(v.to_le_bytes().to_vec(), framing)
    }

    pub fn i64(v: i64, framing: Framing) -> Self {
        Self::frame(v.to_le_bytes().to_vec(), framing)
    }

    pub fn f32(v: f32, framing: Framing) -> Self {
        Self::frame(v.to_le_bytes().to_vec(), framing)
    }

    pub fn f64(v: f64, framing: Framing) -> Self {
        Self::frame(v.to_le_bytes().to_vec(), framing)
    }

    pub fn bool(v: bool, framing: Framing) -> Self {
        Self::frame(vec![u8::from(v)], framing)
    }

    /// A 32-byte fixed string. Fails if `s` plus its terminator is too long.
    pub fn str32(s: &str, framing: Framing) -> Result<Self, CodecError> {
        Ok(Self::frame(fixed_string(s, STR32_WIDTH)?, framing))
    }

    /// A 512-byte fixed string. Fails if `s` plus its terminator is too long.
    pub fn str512(s: &str, framing: Framing) -> Result<Self, CodecError> {
        Ok(Self::frame(fixed_string(s, STR512_WIDTH)?, framing))
    }

    /// Opaque bytes.
    pub fn bytes(data: &[u8], framing: Framing) -> Self {
        Self::frame(data.to_vec(), framing)
    }

    /// Encodes `value` as `kind` under `framing`.
    ///
    /// A [`Value::List`] encodes each element as `kind`, back to back.
    pub fn encode(
        value: &Value,
        kind: Kind,
        framing: Framing,
    ) -> Result<Self, CodecError> {
        let mut native = Vec::with_capacity(kind.width().unwrap_or(0));
        encode_into(value, kind, &mut native)?;
        Ok(Self::frame(native, framing))
    }

    /// Decodes the buffer as `kind`, honouring its framing.
    pub fn decode(&self, kind: Kind) -> Result<Value, CodecError> {
        decode(&self.bytes, kind, self.framing)
    }

    /// Decodes as `kind`, logging and returning `None` on failure.
    ///
    /// Collaborators that only display values use this: a bad payload
    /// becomes a blank cell and a log line rather than an error path.
    pub fn astype(&self, kind: Kind) -> Option<Value> {
        match self.decode(kind) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(
                    %kind,
                    len = self.bytes.len(),
                    error = %e,
                    "could not decode typed value"
                );
                None
            }
        }
    }

    /// Like [`astype`](Self::astype) but takes the textual kind tag.
    pub fn astype_str(&self, tag: &str) -> Option<Value> {
        match Kind::from_str(tag) {
            Ok(kind) => self.astype(kind),
            Err(e) => {
                tracing::error!(tag, error = %e, "could not decode typed value");
                None
            }
        }
    }

    /// The raw wire bytes, including any length prefix.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the value, returning the raw wire bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The bytes after the length prefix (the whole buffer when native).
    pub fn payload(&self) -> &[u8] {
        match self.framing {
            Framing::Generic if self.bytes.len() >= LENGTH_PREFIX => {
                &self.bytes[LENGTH_PREFIX..]
            }
            _ => &self.bytes,
        }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Length of the raw wire bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Concatenates the raw bytes of each value, in order, with no delimiters.
///
/// The receiver can only split the result if it already knows the ordered
/// kinds. [`ArgSchema`](crate::ArgSchema) checks that contract up front.
pub fn concat(values: &[TypedValue]) -> Vec<u8> {
    if let [single] = values {
        return single.bytes.clone();
    }
    let total = values.iter().map(TypedValue::len).sum();
    let mut out = Vec::with_capacity(total);
    for value in values {
        out.extend_from_slice(&value.bytes);
    }
    out
}

/// Decodes `bytes` as `kind` under `framing`.
pub fn decode(
    bytes: &[u8],
    kind: Kind,
    framing: Framing,
) -> Result<Value, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::Empty);
    }
    let body = match framing {
        Framing::Native => bytes,
        Framing::Generic => strip_length_prefix(bytes)?,
    };
    if body.is_empty() {
        return match kind {
            Kind::ByteArray => Ok(Value::Bytes(Vec::new())),
            Kind::StringArray => Ok(Value::Strings(Vec::new())),
            _ => Err(CodecError::Empty),
        };
    }
    decode_native(body, kind)
}

/// Validates and removes the 8-byte length prefix of a generic buffer.
pub(crate) fn strip_length_prefix(bytes: &[u8]) -> Result<&[u8], CodecError> {
    let Some((prefix, body)) = bytes.split_first_chunk::<LENGTH_PREFIX>() else {
        return Err(CodecError::BadLengthPrefix {
            declared: 0,
            available: bytes.len(),
        });
    };
    let declared = u64::from_le_bytes(*prefix);
    if declared != body.len() as u64 {
        return Err(CodecError::BadLengthPrefix {
            declared,
            available: body.len(),
        });
    }
    Ok(body)
}

/// Decodes a native body. `body` is non-empty.
pub(crate) fn decode_native(body: &[u8], kind: Kind) -> Result<Value, CodecError> {
    match Layout::of(kind) {
        Layout::Text => Ok(Value::Str(nul_terminated(body))),
        Layout::Bytes => Ok(Value::Bytes(body.to_vec())),
        Layout::Strings => {
            if body.len() % STR512_WIDTH != 0 {
                return Err(CodecError::Misaligned {
                    kind,
                    len: body.len(),
                    width: STR512_WIDTH,
                });
            }
            Ok(Value::Strings(
                body.chunks_exact(STR512_WIDTH).map(nul_terminated).collect(),
            ))
        }
        Layout::Scalar(scalar) => {
            let width = scalar.width();
            if body.len() % width != 0 {
                return Err(CodecError::Misaligned {
                    kind,
                    len: body.len(),
                    width,
                });
            }
            let mut items: Vec<Value> = body
                .chunks_exact(width)
                .map(|chunk| scalar.read(chunk))
                .collect();
            if items.len() == 1 {
                Ok(items.remove(0))
            } else {
                Ok(Value::List(items))
            }
        }
    }
}

/// How a kind's native bytes are laid out.
enum Layout {
    /// One NUL-terminated string.
    Text,
    Bytes,
    /// Consecutive 512-byte string slots.
    Strings,
    Scalar(Scalar),
}

impl Layout {
    fn of(kind: Kind) -> Self {
        match kind {
            Kind::Str32 | Kind::Str512 => Layout::Text,
            Kind::ByteArray => Layout::Bytes,
            Kind::StringArray => Layout::Strings,
            Kind::U8 => Layout::Scalar(Scalar::U8),
            Kind::I8 => Layout::Scalar(Scalar::I8),
            Kind::U16 => Layout::Scalar(Scalar::U16),
            Kind::I16 => Layout::Scalar(Scalar::I16),
            Kind::U32 => Layout::Scalar(Scalar::U32),
            Kind::I32 => Layout::Scalar(Scalar::I32),
            Kind::F32 => Layout::Scalar(Scalar::F32),
            Kind::U64 => Layout::Scalar(Scalar::U64),
            Kind::I64 => Layout::Scalar(Scalar::I64),
            Kind::F64 => Layout::Scalar(Scalar::F64),
            Kind::Bool => Layout::Scalar(Scalar::Bool),
        }
    }
}

/// Numeric and bool kinds, each with its element width.
#[derive(Clone, Copy)]
enum Scalar {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    U64,
    I64,
    F64,
    Bool,
}

impl Scalar {
    fn width(self) -> usize {
        match self {
            Scalar::U8 | Scalar::I8 | Scalar::Bool => 1,
            Scalar::U16 | Scalar::I16 => 2,
            Scalar::U32 | Scalar::I32 | Scalar::F32 => 4,
            Scalar::U64 | Scalar::I64 | Scalar::F64 => 8,
        }
    }

    /// Reads one element. `chunk` is exactly `self.width()` bytes.
    fn read(self, chunk: &[u8]) -> Value {
        fn arr<const N: usize>(chunk: &[u8]) -> [u8; N] {
            let mut out = [0u8; N];
            out.copy_from_slice(&chunk[..N]);
            out
        }

        match self {
            Scalar::U8 => Value::U8(chunk[0]),
            Scalar::I8 => Value::I8(i8::from_le_bytes(arr(chunk))),
            Scalar::U16 => Value::U16(u16::from_le_bytes(arr(chunk))),
            Scalar::I16 => Value::I16(i16::from_le_bytes(arr(chunk))),
            Scalar::U32 => Value::U32(u32::from_le_bytes(arr(chunk))),
            Scalar::I32 => Value::I32(i32::from_le_bytes(arr(chunk))),
            Scalar::F32 => Value::F32(f32::from_le_bytes(arr(chunk))),
            Scalar::U64 => Value::U64(u64::from_le_bytes(arr(chunk))),
            Scalar::I64 => Value::I64(i64::from_le_bytes(arr(chunk))),
            Scalar::F64 => Value::F64(f64::from_le_bytes(arr(chunk))),
            Scalar::Bool => Value::Bool(chunk[0] != 0),
        }
    }
}

/// UTF-8 up to the first NUL (or the whole slice if there is none).
fn nul_terminated(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Lays `s` + NUL into a zeroed slot of `width` bytes.
fn fixed_string(s: &str, width: usize) -> Result<Vec<u8>, CodecError> {
    let len = s.len() + 1;
    if len > width {
        return Err(CodecError::StringTooLong { len, width });
    }
    let mut slot = vec![0u8; width];
    slot[..s.len()].copy_from_slice(s.as_bytes());
    Ok(slot)
}

fn encode_into(
    value: &Value,
    kind: Kind,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    match (kind, value) {
        (Kind::U8, Value::U8(v)) => out.push(*v),
        (Kind::U16, Value::U16(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (Kind::U32, Value::U32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (Kind::U64, Value::U64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (Kind::I8, Value::I8(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (Kind::I16, Value::I16(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (Kind::I32, Value::I32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (Kind::I64, Value::I64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (Kind::F32, Value::F32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (Kind::F64, Value::F64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (Kind::Bool, Value::Bool(v)) => out.push(u8::from(*v)),
        (Kind::Str32, Value::Str(s)) => {
            out.extend_from_slice(&fixed_string(s, STR32_WIDTH)?);
        }
        (Kind::Str512, Value::Str(s)) => {
            out.extend_from_slice(&fixed_string(s, STR512_WIDTH)?);
        }
        (Kind::ByteArray, Value::Bytes(b)) => out.extend_from_slice(b),
        (Kind::StringArray, Value::Strings(items)) => {
            for s in items {
                out.extend_from_slice(&fixed_string(s, STR512_WIDTH)?);
            }
        }
        (kind, Value::List(items)) if kind.is_numeric() => {
            for item in items {
                if matches!(item, Value::List(_)) {
                    return Err(CodecError::TypeMismatch {
                        kind,
                        reason: "nested list".into(),
                    });
                }
                encode_into(item, kind, out)?;
            }
        }
        (kind, other) => {
            return Err(CodecError::TypeMismatch {
                kind,
                reason: format!("got a {} value", other.variant_name()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: Value, kind: Kind) -> Value {
        let encoded = TypedValue::encode(&value, kind, Framing::Native)
            .expect("encode");
        encoded.decode(kind).expect("decode")
    }

    // =====================================================================
    // Round trips over boundary values
    // =====================================================================

    #[test]
    fn test_unsigned_boundaries_round_trip() {
        for v in [0u8, 1, u8::MAX] {
            assert_eq!(roundtrip(Value::U8(v), Kind::U8), Value::U8(v));
        }
        for v in [0u16, u16::MAX] {
            assert_eq!(roundtrip(Value::U16(v), Kind::U16), Value::U16(v));
        }
        for v in [0u32, u32::MAX] {
            assert_eq!(roundtrip(Value::U32(v), Kind::U32), Value::U32(v));
        }
        for v in [0u64, u64::MAX] {
            assert_eq!(roundtrip(Value::U64(v), Kind::U64), Value::U64(v));
        }
    }

    #[test]
    fn test_signed_boundaries_round_trip() {
        for v in [0i8, -1, i8::MIN, i8::MAX] {
            assert_eq!(roundtrip(Value::I8(v), Kind::I8), Value::I8(v));
        }
        for v in [0i16, -1, i16::MIN, i16::MAX] {
            assert_eq!(roundtrip(Value::I16(v), Kind::I16), Value::I16(v));
        }
        for v in [0i32, -1, i32::MIN, i32::MAX] {
            assert_eq!(roundtrip(Value::I32(v), Kind::I32), Value::I32(v));
        }
        for v in [0i64, -1, i64::MIN, i64::MAX] {
            assert_eq!(roundtrip(Value::I64(v), Kind::I64), Value::I64(v));
        }
    }

    #[test]
    fn test_float_specials_round_trip() {
        for v in [0.0f64, -1.5, f64::MAX, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(roundtrip(Value::F64(v), Kind::F64), Value::F64(v));
        }
        for v in [0.0f32, -1.5, f32::MAX, f32::INFINITY] {
            assert_eq!(roundtrip(Value::F32(v), Kind::F32), Value::F32(v));
        }
        // NaN != NaN, so compare through is_nan.
        let nan = roundtrip(Value::F64(f64::NAN), Kind::F64);
        assert!(matches!(nan, Value::F64(v) if v.is_nan()));
        let nan = roundtrip(Value::F32(f32::NAN), Kind::F32);
        assert!(matches!(nan, Value::F32(v) if v.is_nan()));
    }

    #[test]
    fn test_bool_encodes_as_single_byte() {
        let t = TypedValue::bool(true, Framing::Native);
        assert_eq!(t.as_bytes(), &[1]);
        let f = TypedValue::bool(false, Framing::Native);
        assert_eq!(f.as_bytes(), &[0]);
        assert_eq!(t.decode(Kind::Bool).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_fixed_width_is_exact() {
        assert_eq!(TypedValue::u16(1, Framing::Native).len(), 2);
        assert_eq!(TypedValue::i32(-1, Framing::Native).len(), 4);
        assert_eq!(TypedValue::f64(1.0, Framing::Native).len(), 8);
        assert_eq!(TypedValue::u32(7, Framing::Native).as_bytes(), &[7, 0, 0, 0]);
    }

    // =====================================================================
    // Generic framing
    // =====================================================================

    #[test]
    fn test_generic_prefix_equals_native_length() {
        let cases = [
            (Value::U8(9), Kind::U8),
            (Value::F64(2.5), Kind::F64),
            (Value::Str("key".into()), Kind::Str512),
            (Value::Bytes(vec![1, 2, 3, 4, 5]), Kind::ByteArray),
        ];
        for (value, kind) in cases {
            let native = TypedValue::encode(&value, kind, Framing::Native).unwrap();
            let generic = TypedValue::encode(&value, kind, Framing::Generic).unwrap();
            let prefix = u64::from_le_bytes(generic.as_bytes()[..8].try_into().unwrap());
            assert_eq!(prefix, native.len() as u64);
            assert_eq!(&generic.as_bytes()[8..], native.as_bytes());
            assert_eq!(generic.decode(kind).unwrap(), value);
        }
    }

    #[test]
    fn test_generic_with_wrong_prefix_is_rejected() {
        let mut bytes = 10u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        let err = decode(&bytes, Kind::U32, Framing::Generic).unwrap_err();
        assert_eq!(
            err,
            CodecError::BadLengthPrefix { declared: 10, available: 4 }
        );
    }

    #[test]
    fn test_generic_shorter_than_prefix_is_rejected() {
        let err = decode(&[1, 2, 3], Kind::U8, Framing::Generic).unwrap_err();
        assert!(matches!(err, CodecError::BadLengthPrefix { .. }));
    }

    #[test]
    fn test_generic_empty_bytearray() {
        let t = TypedValue::bytes(&[], Framing::Generic);
        assert_eq!(t.len(), 8);
        assert_eq!(t.decode(Kind::ByteArray).unwrap(), Value::Bytes(vec![]));
        assert!(t.payload().is_empty());
    }

    // =====================================================================
    // Fixed strings
    // =====================================================================

    #[test]
    fn test_str32_too_long_fails() {
        let s = "a".repeat(32); // 32 + NUL = 33 > 32
        let err = TypedValue::str32(&s, Framing::Native).unwrap_err();
        assert_eq!(err, CodecError::StringTooLong { len: 33, width: 32 });
    }

    #[test]
    fn test_str32_one_under_limit_is_zero_padded() {
        let s = "a".repeat(30); // 30 + NUL = 31
        let t = TypedValue::str32(&s, Framing::Native).unwrap();
        assert_eq!(t.len(), 32);
        assert_eq!(&t.as_bytes()[..30], s.as_bytes());
        assert_eq!(&t.as_bytes()[30..], &[0, 0]);
        assert_eq!(t.decode(Kind::Str32).unwrap(), Value::Str(s));
    }

    #[test]
    fn test_str512_exactly_full_with_terminator() {
        let s = "k".repeat(511);
        let t = TypedValue::str512(&s, Framing::Native).unwrap();
        assert_eq!(t.len(), 512);
        assert_eq!(t.as_bytes()[511], 0);
    }

    #[test]
    fn test_multibyte_utf8_counts_bytes_not_chars() {
        // 16 two-byte chars = 32 bytes + NUL: does not fit.
        let s = "é".repeat(16);
        assert!(TypedValue::str32(&s, Framing::Native).is_err());
    }

    #[test]
    fn test_string_decode_stops_at_first_nul() {
        let mut bytes = b"abc\0def".to_vec();
        bytes.resize(32, 0);
        let v = decode(&bytes, Kind::Str32, Framing::Native).unwrap();
        assert_eq!(v, Value::Str("abc".into()));
    }

    #[test]
    fn test_string_array_round_trip() {
        let v = Value::Strings(vec!["/a".into(), "/b/c".into()]);
        let t = TypedValue::encode(&v, Kind::StringArray, Framing::Generic).unwrap();
        assert_eq!(t.payload().len(), 1024);
        assert_eq!(t.decode(Kind::StringArray).unwrap(), v);
    }

    // =====================================================================
    // Multi-element buffers
    // =====================================================================

    #[test]
    fn test_multi_element_buffer_decodes_to_list() {
        let v = Value::List(vec![Value::F32(1.0), Value::F32(2.0), Value::F32(3.0)]);
        let t = TypedValue::encode(&v, Kind::F32, Framing::Native).unwrap();
        assert_eq!(t.len(), 12);
        assert_eq!(t.decode(Kind::F32).unwrap(), v);
    }

    #[test]
    fn test_scalar_layout_widths_agree_with_kind() {
        let kinds = [
            Kind::U8, Kind::I8, Kind::U16, Kind::I16, Kind::U32, Kind::I32,
            Kind::F32, Kind::U64, Kind::I64, Kind::F64, Kind::Bool,
        ];
        for kind in kinds {
            match Layout::of(kind) {
                Layout::Scalar(scalar) => assert_eq!(Some(scalar.width()), kind.width(), "{kind}"),
                _ => panic!("{kind} should decode as a scalar"),
            }
        }
        assert!(matches!(Layout::of(Kind::Str32), Layout::Text));
        assert!(matches!(Layout::of(Kind::StringArray), Layout::Strings));
        assert!(matches!(Layout::of(Kind::ByteArray), Layout::Bytes));
    }

    #[test]
    fn test_misaligned_buffer_is_rejected() {
        let err = decode(&[1, 2, 3], Kind::U16, Framing::Native).unwrap_err();
        assert_eq!(err, CodecError::Misaligned { kind: Kind::U16, len: 3, width: 2 });
    }

    // =====================================================================
    // Errors and sentinels
    // =====================================================================

    #[test]
    fn test_type_mismatch_on_encode() {
        let err = TypedValue::encode(&Value::Str("x".into()), Kind::U8, Framing::Native)
            .unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { kind: Kind::U8, .. }));
    }

    #[test]
    fn test_empty_payload_is_an_error() {
        assert_eq!(decode(&[], Kind::U8, Framing::Native), Err(CodecError::Empty));
    }

    #[test]
    fn test_astype_returns_none_instead_of_error() {
        let t = TypedValue::from_bytes(vec![1, 2, 3], Framing::Native);
        assert_eq!(t.astype(Kind::U32), None);
        assert_eq!(t.astype_str("notakind"), None);
        assert_eq!(t.astype_str("uint8"), Some(Value::List(vec![
            Value::U8(1),
            Value::U8(2),
            Value::U8(3),
        ])));
    }

    // =====================================================================
    // concat
    // =====================================================================

    #[test]
    fn test_concat_preserves_order_without_delimiters() {
        let a = TypedValue::u8(1, Framing::Native);
        let b = TypedValue::u16(0x0302, Framing::Native);
        let c = TypedValue::bool(true, Framing::Generic);
        let out = concat(&[a, b, c]);
        assert_eq!(out, vec![1, 2, 3, 1, 0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_concat_of_nothing_is_empty() {
        assert!(concat(&[]).is_empty());
    }
}
