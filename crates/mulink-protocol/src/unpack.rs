//! Splitting a buffer of packed records back into values.
//!
//! Server methods that return tables (log lines, client lists, run
//! metadata) pack one record after another with no separators. The
//! caller supplies the record layout as a schema of kinds:
//!
//! ```text
//! schema [U32, Str32]   bytes  |u32|--- 32 ---|u32|--- 32 ---|
//!                               \ record 0  / \ record 1  /
//! ```
//!
//! Variable-width kinds inside a record carry their own 8-byte
//! little-endian length in front of their bytes.

use crate::kind::LENGTH_PREFIX;
use crate::value::{decode_native, strip_length_prefix};
use crate::{CodecError, Framing, Kind, TypedValue, Value};

/// Decodes `bytes` as a sequence of records laid out per `schema`.
///
/// Returns one `Vec<Value>` per full pass through the schema. A buffer
/// that ends part-way through a record is reported as
/// [`CodecError::TrailingBytes`]; nothing is silently dropped.
pub fn unpack(bytes: &[u8], schema: &[Kind]) -> Result<Vec<Vec<Value>>, CodecError> {
    if schema.is_empty() {
        return Err(CodecError::EmptySchema);
    }

    let mut records = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let mut record = Vec::with_capacity(schema.len());
        for kind in schema {
            let (value, used) = read_one(bytes, offset, *kind)?;
            record.push(value);
            offset += used;
        }
        records.push(record);
    }

    Ok(records)
}

/// Reads one value of `kind` at `offset`. Returns the value and bytes consumed.
fn read_one(
    bytes: &[u8],
    offset: usize,
    kind: Kind,
) -> Result<(Value, usize), CodecError> {
    let rest = &bytes[offset..];
    let short = || CodecError::TrailingBytes {
        offset,
        remaining: rest.len(),
    };

    match kind.width() {
        Some(width) => {
            let field = rest.get(..width).ok_or_else(short)?;
            Ok((decode_native(field, kind)?, width))
        }
        None => {
            let prefix = rest
                .first_chunk::<LENGTH_PREFIX>()
                .ok_or_else(short)?;
            let len = usize::try_from(u64::from_le_bytes(*prefix))
                .map_err(|_| short())?;
            let end = LENGTH_PREFIX.checked_add(len).ok_or_else(short)?;
            let field = rest.get(LENGTH_PREFIX..end).ok_or_else(short)?;
            let value = if field.is_empty() {
                match kind {
                    Kind::StringArray => Value::Strings(Vec::new()),
                    _ => Value::Bytes(Vec::new()),
                }
            } else {
                decode_native(field, kind)?
            };
            Ok((value, end))
        }
    }
}

impl TypedValue {
    /// Unpacks this value's payload as records laid out per `schema`.
    ///
    /// For generic framing the outer length prefix is validated and
    /// skipped first.
    pub fn unpack(&self, schema: &[Kind]) -> Result<Vec<Vec<Value>>, CodecError> {
        let body = match self.framing() {
            Framing::Native => self.as_bytes(),
            Framing::Generic => strip_length_prefix(self.as_bytes())?,
        };
        unpack(body, schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concat;

    fn record(id: u32, name: &str, stamp: i64) -> Vec<TypedValue> {
        vec![
            TypedValue::u32(id, Framing::Native),
            TypedValue::str32(name, Framing::Native).unwrap(),
            TypedValue::i64(stamp, Framing::Native),
        ]
    }

    #[test]
    fn test_three_repeats_give_three_tuples() {
        let mut parts = record(1, "alpha", -10);
        parts.extend(record(2, "beta", 0));
        parts.extend(record(3, "gamma", 99));
        let bytes = concat(&parts);

        let rows = unpack(&bytes, &[Kind::U32, Kind::Str32, Kind::I64]).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![Value::U32(1), Value::Str("alpha".into()), Value::I64(-10)]);
        assert_eq!(rows[1], vec![Value::U32(2), Value::Str("beta".into()), Value::I64(0)]);
        assert_eq!(rows[2], vec![Value::U32(3), Value::Str("gamma".into()), Value::I64(99)]);
    }

    #[test]
    fn test_partial_record_is_reported() {
        let mut bytes = concat(&record(1, "alpha", 5));
        bytes.extend_from_slice(&[0xAA, 0xBB]);

        let err = unpack(&bytes, &[Kind::U32, Kind::Str32, Kind::I64]).unwrap_err();

        assert_eq!(err, CodecError::TrailingBytes { offset: 44, remaining: 2 });
    }

    #[test]
    fn test_bytearray_uses_embedded_length() {
        // (u8 last, bytearray chunk) as returned by a chunked download.
        let bytes = concat(&[
            TypedValue::u8(0, Framing::Native),
            TypedValue::bytes(&[9, 8, 7], Framing::Generic),
            TypedValue::u8(1, Framing::Native),
            TypedValue::bytes(&[], Framing::Generic),
        ]);

        let rows = unpack(&bytes, &[Kind::U8, Kind::ByteArray]).unwrap();

        assert_eq!(rows, vec![
            vec![Value::U8(0), Value::Bytes(vec![9, 8, 7])],
            vec![Value::U8(1), Value::Bytes(vec![])],
        ]);
    }

    #[test]
    fn test_bytearray_length_past_end_is_reported() {
        let mut bytes = 100u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[1, 2]);

        let err = unpack(&bytes, &[Kind::ByteArray]).unwrap_err();

        assert_eq!(err, CodecError::TrailingBytes { offset: 0, remaining: 10 });
    }

    #[test]
    fn test_empty_buffer_gives_no_rows() {
        assert_eq!(unpack(&[], &[Kind::U8]).unwrap(), Vec::<Vec<Value>>::new());
    }

    #[test]
    fn test_empty_schema_is_rejected() {
        assert_eq!(unpack(&[1], &[]), Err(CodecError::EmptySchema));
    }

    #[test]
    fn test_unpack_generic_typed_value() {
        let inner = concat(&[
            TypedValue::str32("c0", Framing::Native).unwrap(),
            TypedValue::u64(7, Framing::Native),
        ]);
        let value = TypedValue::bytes(&inner, Framing::Generic);

        let rows = value.unpack(&[Kind::Str32, Kind::U64]).unwrap();

        assert_eq!(rows, vec![vec![Value::Str("c0".into()), Value::U64(7)]]);
    }
}
