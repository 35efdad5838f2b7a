//! Schema-driven call codec
//!
//! Wire layout of a call: `pallet_index:u8 ++ call_index:u8 ++ args`, each
//! argument encoded in SCALE according to its [`ArgType`]. Nested calls in
//! `Call` slots are encoded inline; `OpaqueCall` slots wrap the nested bytes
//! in a compact length prefix and are decoded recursively with the same
//! table.

use crate::reader::Reader;
use crate::schema::{ArgSlot, ArgType, Schema};
use crate::value::{OpaqueCall, Value};
use parity_scale_codec::{Compact, Encode};
use quorum_errors::{Error, Result};
use quorum_types::{AccountId32, MultiAddress, H256};
use tracing::trace;

/// Deepest nesting of calls inside calls accepted by the decoder
pub const MAX_CALL_DEPTH: usize = 16;

/// Encoder and decoder over an immutable schema table
#[derive(Debug, Clone, Copy)]
pub struct CallCodec<'a> {
    schema: &'a Schema,
}

impl<'a> CallCodec<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Canonical call data of `call`
    pub fn encode(&self, call: &OpaqueCall) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_to(call, &mut out, 0)?;
        Ok(out)
    }

    /// Decode call data that must be consumed completely
    pub fn decode(&self, bytes: &[u8]) -> Result<OpaqueCall> {
        let mut reader = Reader::new(bytes);
        let call = self.decode_from(&mut reader)?;
        reader.finish("call")?;
        Ok(call)
    }

    /// Decode one call from the front of `reader`, leaving the rest
    pub fn decode_from(&self, reader: &mut Reader<'_>) -> Result<OpaqueCall> {
        self.decode_call_at(reader, 0)
    }

    /// `blake2_256` of the encoded call
    pub fn call_hash(&self, call: &OpaqueCall) -> Result<H256> {
        Ok(call_hash_of(&self.encode(call)?))
    }

    fn encode_to(&self, call: &OpaqueCall, out: &mut Vec<u8>, depth: usize) -> Result<()> {
        if depth > MAX_CALL_DEPTH {
            return Err(Error::SchemaMismatch(format!(
                "call nesting deeper than {MAX_CALL_DEPTH}"
            )));
        }
        let (pallet, schema) = self.schema.require(&call.pallet, &call.method)?;
        if call.args.len() != schema.args.len() {
            return Err(Error::SchemaMismatch(format!(
                "{}.{} takes {} arguments, got {}",
                call.pallet,
                call.method,
                schema.args.len(),
                call.args.len()
            )));
        }

        out.push(pallet.index);
        out.push(schema.index);
        for (slot, value) in schema.args.iter().zip(&call.args) {
            let path = format!("{}.{}.{}", call.pallet, call.method, slot.name);
            self.encode_value(&slot.ty, value, &path, out, depth)?;
        }
        trace!("encoded {}.{} at depth {}", call.pallet, call.method, depth);
        Ok(())
    }

    fn encode_value(
        &self,
        ty: &ArgType,
        value: &Value,
        path: &str,
        out: &mut Vec<u8>,
        depth: usize,
    ) -> Result<()> {
        match (ty, value) {
            (ArgType::Bool, Value::Bool(b)) => out.push(u8::from(*b)),
            (ArgType::U8, Value::UInt(v)) => encode_uint(*v, 1, path, out)?,
            (ArgType::U16, Value::UInt(v)) => encode_uint(*v, 2, path, out)?,
            (ArgType::U32, Value::UInt(v)) => encode_uint(*v, 4, path, out)?,
            (ArgType::U64, Value::UInt(v)) => encode_uint(*v, 8, path, out)?,
            (ArgType::U128, Value::UInt(v)) => encode_uint(*v, 16, path, out)?,
            (ArgType::Compact, Value::UInt(v)) => Compact(*v).encode_to(out),
            (ArgType::AccountId, Value::AccountId(account)) => {
                out.extend_from_slice(account.as_bytes())
            }
            (ArgType::MultiAddress, Value::Address(address)) => address.encode_to(out),
            (ArgType::Bytes, Value::Bytes(bytes)) => bytes.encode_to(out),
            (ArgType::H256, Value::Hash(hash)) => out.extend_from_slice(hash.as_bytes()),
            (ArgType::Vec(inner), Value::Seq(items)) => {
                Compact(items.len() as u32).encode_to(out);
                for (i, item) in items.iter().enumerate() {
                    self.encode_value(inner, item, &format!("{path}[{i}]"), out, depth)?;
                }
            }
            (ArgType::Option(_), Value::Option(None)) => out.push(0),
            (ArgType::Option(inner), Value::Option(Some(item))) => {
                out.push(1);
                self.encode_value(inner, item, path, out, depth)?;
            }
            (ArgType::Composite(fields), Value::Composite(values)) => {
                if fields.len() != values.len() {
                    return Err(Error::SchemaMismatch(format!(
                        "{path}: expected {} fields, got {}",
                        fields.len(),
                        values.len()
                    )));
                }
                for (field, item) in fields.iter().zip(values) {
                    let path = format!("{path}.{}", field.name);
                    self.encode_value(&field.ty, item, &path, out, depth)?;
                }
            }
            (ArgType::Call, Value::Call(call)) => self.encode_to(call, out, depth + 1)?,
            (ArgType::OpaqueCall, Value::Call(call)) => {
                let mut inner = Vec::new();
                self.encode_to(call, &mut inner, depth + 1)?;
                inner.encode_to(out);
            }
            (ty, value) => {
                return Err(Error::SchemaMismatch(format!(
                    "{path}: expected {}, got {}",
                    type_name(ty),
                    value.kind()
                )))
            }
        }
        Ok(())
    }

    fn decode_call_at(&self, reader: &mut Reader<'_>, depth: usize) -> Result<OpaqueCall> {
        if depth > MAX_CALL_DEPTH {
            return Err(Error::InvalidEncoding(format!(
                "call nesting deeper than {MAX_CALL_DEPTH}"
            )));
        }
        let pallet_index = reader.read_u8("call pallet index")?;
        let call_index = reader.read_u8("call index")?;
        let (pallet, schema) = self
            .schema
            .lookup_index(pallet_index, call_index)
            .ok_or_else(|| {
                Error::SchemaMismatch(format!("unknown call tag {pallet_index}/{call_index}"))
            })?;

        let mut args = Vec::with_capacity(schema.args.len());
        for slot in &schema.args {
            let path = format!("{}.{}.{}", pallet.name, schema.name, slot.name);
            args.push(self.decode_value(&slot.ty, reader, &path, depth)?);
        }
        trace!("decoded {}.{} at depth {}", pallet.name, schema.name, depth);
        Ok(OpaqueCall::new(pallet.name.clone(), schema.name.clone(), args))
    }

    fn decode_value(
        &self,
        ty: &ArgType,
        reader: &mut Reader<'_>,
        path: &str,
        depth: usize,
    ) -> Result<Value> {
        let value = match ty {
            ArgType::Bool => match reader.read_u8(path)? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => {
                    return Err(Error::InvalidEncoding(format!(
                        "{path}: bool byte {other:#04x}"
                    )))
                }
            },
            ArgType::U8 => Value::UInt(reader.read_uint(1, path)?),
            ArgType::U16 => Value::UInt(reader.read_uint(2, path)?),
            ArgType::U32 => Value::UInt(reader.read_uint(4, path)?),
            ArgType::U64 => Value::UInt(reader.read_uint(8, path)?),
            ArgType::U128 => Value::UInt(reader.read_uint(16, path)?),
            ArgType::Compact => Value::UInt(reader.read_compact(path)?),
            ArgType::AccountId => Value::AccountId(AccountId32::new(reader.read_array(path)?)),
            ArgType::MultiAddress => Value::Address(decode_multi_address(reader, path)?),
            ArgType::Bytes => Value::Bytes(reader.read_prefixed_bytes(path)?.to_vec()),
            ArgType::H256 => Value::Hash(H256(reader.read_array(path)?)),
            ArgType::Vec(inner) => {
                let len = reader.read_len(path)?;
                let mut items = Vec::with_capacity(len.min(reader.remaining()));
                for i in 0..len {
                    let before = reader.remaining();
                    items.push(self.decode_value(inner, reader, &format!("{path}[{i}]"), depth)?);
                    if reader.remaining() == before {
                        return Err(Error::InvalidEncoding(format!(
                            "{path}: {len} elements of zero width"
                        )));
                    }
                }
                Value::Seq(items)
            }
            ArgType::Option(inner) => match reader.read_u8(path)? {
                0 => Value::Option(None),
                1 => Value::Option(Some(Box::new(self.decode_value(
                    inner, reader, path, depth,
                )?))),
                other => {
                    return Err(Error::InvalidEncoding(format!(
                        "{path}: option discriminant {other}"
                    )))
                }
            },
            ArgType::Composite(fields) => {
                let mut values = Vec::with_capacity(fields.len());
                for ArgSlot { name, ty } in fields {
                    values.push(self.decode_value(ty, reader, &format!("{path}.{name}"), depth)?);
                }
                Value::Composite(values)
            }
            ArgType::Call => Value::Call(Box::new(self.decode_call_at(reader, depth + 1)?)),
            ArgType::OpaqueCall => {
                let bytes = reader.read_prefixed_bytes(path)?;
                let mut inner = Reader::new(bytes);
                let call = self.decode_call_at(&mut inner, depth + 1)?;
                inner.finish(path)?;
                Value::Call(Box::new(call))
            }
        };
        Ok(value)
    }
}

fn encode_uint(value: u128, width: usize, path: &str, out: &mut Vec<u8>) -> Result<()> {
    if width < 16 && value >> (width * 8) != 0 {
        return Err(Error::SchemaMismatch(format!(
            "{path}: {value} does not fit in u{}",
            width * 8
        )));
    }
    out.extend_from_slice(&value.to_le_bytes()[..width]);
    Ok(())
}

fn decode_multi_address(reader: &mut Reader<'_>, path: &str) -> Result<MultiAddress> {
    let address = match reader.read_u8(path)? {
        0 => MultiAddress::Id(AccountId32::new(reader.read_array(path)?)),
        1 => {
            let index = reader.read_compact(path)?;
            let index = u32::try_from(index).map_err(|_| {
                Error::InvalidEncoding(format!("{path}: account index {index} overflows u32"))
            })?;
            MultiAddress::Index(index)
        }
        2 => MultiAddress::Raw(reader.read_prefixed_bytes(path)?.to_vec()),
        3 => MultiAddress::Address32(reader.read_array(path)?),
        4 => MultiAddress::Address20(reader.read_array(path)?),
        other => {
            return Err(Error::InvalidEncoding(format!(
                "{path}: address variant {other}"
            )))
        }
    };
    Ok(address)
}

fn type_name(ty: &ArgType) -> String {
    match ty {
        ArgType::Vec(inner) => format!("Vec<{}>", type_name(inner)),
        ArgType::Option(inner) => format!("Option<{}>", type_name(inner)),
        ArgType::Composite(fields) => format!("composite of {} fields", fields.len()),
        other => format!("{other:?}"),
    }
}

/// `blake2_256` of raw call data
pub fn call_hash_of(call_data: &[u8]) -> H256 {
    H256::hash_of(call_data)
}

/// Encode a call given by names and positional arguments
pub fn encode_call(pallet: &str, method: &str, args: Vec<Value>, schema: &Schema) -> Result<Vec<u8>> {
    CallCodec::new(schema).encode(&OpaqueCall::new(pallet, method, args))
}

/// Decode complete call data
pub fn decode_call(bytes: &[u8], schema: &Schema) -> Result<OpaqueCall> {
    CallCodec::new(schema).decode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::names;
    use quorum_types::Timepoint;

    const EVE: &str = "5HGjWAeFDfFCWPsjFQdVV2Msvz2XtMktvgocEZcCj68kUMaw";
    const TRANSFER_HEX: &str =
        "050300e659a7a1628cdd93febc04a4e0646ea20e9f5f0ce097d9a05290d4a9e054df4e0b00a0724e1809";
    const TRANSFER_HASH: &str =
        "0x0491847e080c5166ded52158d50e5123873156cbe39ca7ba5d1c896f3ab0b817";

    fn eve() -> AccountId32 {
        EVE.parse().unwrap()
    }

    fn transfer() -> OpaqueCall {
        OpaqueCall::new(
            names::BALANCES,
            names::TRANSFER_KEEP_ALIVE,
            vec![
                MultiAddress::Id(eve()).into(),
                Value::UInt(10_000_000_000_000),
            ],
        )
    }

    #[test]
    fn test_encode_transfer_keep_alive() {
        let schema = Schema::polkadot();
        let codec = CallCodec::new(&schema);
        let bytes = codec.encode(&transfer()).unwrap();
        assert_eq!(hex::encode(&bytes), TRANSFER_HEX);
        assert_eq!(codec.call_hash(&transfer()).unwrap().to_string(), TRANSFER_HASH);
    }

    #[test]
    fn test_decode_transfer_keep_alive() {
        let schema = Schema::polkadot();
        let bytes = hex::decode(TRANSFER_HEX).unwrap();
        let call = decode_call(&bytes, &schema).unwrap();
        assert_eq!(call, transfer());
        assert_eq!(call.args[0].as_account_id(), Some(&eve()));
    }

    #[test]
    fn test_as_multi_nests_opaque_call() {
        let schema = Schema::polkadot();
        let codec = CallCodec::new(&schema);
        let inner = codec.encode(&transfer()).unwrap();

        let as_multi = OpaqueCall::new(
            names::MULTISIG,
            names::AS_MULTI,
            vec![
                Value::UInt(2),
                Value::Seq(vec![eve().into()]),
                Value::from(Some(Timepoint::new(10, 1))),
                transfer().into(),
                Value::Bool(false),
                Value::UInt(1_000_000),
            ],
        );
        let bytes = codec.encode(&as_multi).unwrap();

        let mut expected = vec![30u8, 1, 2, 0, 4];
        expected.extend_from_slice(eve().as_bytes());
        expected.push(1);
        expected.extend_from_slice(&10u32.to_le_bytes());
        expected.extend_from_slice(&1u32.to_le_bytes());
        expected.extend_from_slice(&Compact(inner.len() as u32).encode());
        expected.extend_from_slice(&inner);
        expected.push(0);
        expected.extend_from_slice(&1_000_000u64.to_le_bytes());
        assert_eq!(bytes, expected);

        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, as_multi);
        assert_eq!(decoded.args[3].as_call(), Some(&transfer()));
    }

    #[test]
    fn test_decode_is_canonical() {
        let schema = Schema::polkadot();
        let bytes = hex::decode(TRANSFER_HEX).unwrap();
        let call = decode_call(&bytes, &schema).unwrap();
        let again = encode_call(&call.pallet, &call.method, call.args.clone(), &schema).unwrap();
        assert_eq!(again, bytes);
    }

    #[test]
    fn test_unknown_tag_is_schema_mismatch() {
        let schema = Schema::polkadot();
        assert!(matches!(
            decode_call(&[5, 99, 0], &schema),
            Err(Error::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_truncated_and_trailing_input() {
        let schema = Schema::polkadot();
        let bytes = hex::decode(TRANSFER_HEX).unwrap();

        match decode_call(&bytes[..bytes.len() - 2], &schema) {
            Err(Error::TruncatedInput {
                needed, remaining, ..
            }) => {
                assert_eq!(needed, 7);
                assert_eq!(remaining, 5);
            }
            other => panic!("expected truncation, got {other:?}"),
        }

        let mut padded = bytes.clone();
        padded.push(0);
        assert_eq!(
            decode_call(&padded, &schema),
            Err(Error::TrailingInput {
                context: "call".to_string(),
                remaining: 1
            })
        );
    }

    #[test]
    fn test_wrong_argument_shape() {
        let schema = Schema::polkadot();
        let bad = OpaqueCall::new(
            names::BALANCES,
            names::TRANSFER_KEEP_ALIVE,
            vec![Value::UInt(1), Value::UInt(2)],
        );
        assert!(matches!(
            CallCodec::new(&schema).encode(&bad),
            Err(Error::SchemaMismatch(_))
        ));

        let short = OpaqueCall::new(names::BALANCES, names::TRANSFER, vec![]);
        assert!(CallCodec::new(&schema).encode(&short).is_err());
    }

    #[test]
    fn test_uint_overflow_rejected() {
        let schema = Schema::polkadot();
        let call = OpaqueCall::new(
            names::MULTISIG,
            names::CANCEL_AS_MULTI,
            vec![
                Value::UInt(70_000),
                Value::Seq(vec![]),
                Timepoint::new(1, 0).into(),
                H256([0u8; 32]).into(),
            ],
        );
        assert!(matches!(
            CallCodec::new(&schema).encode(&call),
            Err(Error::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_opaque_call_must_be_consumed() {
        let schema = Schema::polkadot();
        let inner = hex::decode(TRANSFER_HEX).unwrap();
        let mut padded_inner = inner.clone();
        padded_inner.push(0xff);

        let mut bytes = vec![30u8, 1, 2, 0, 0, 0];
        bytes.extend_from_slice(&Compact(padded_inner.len() as u32).encode());
        bytes.extend_from_slice(&padded_inner);
        bytes.push(0);
        bytes.extend_from_slice(&0u64.to_le_bytes());

        assert!(matches!(
            decode_call(&bytes, &schema),
            Err(Error::TrailingInput { .. })
        ));
    }

    #[test]
    fn test_zero_width_elements_rejected() {
        use crate::schema::{CallSchema, PalletSchema};

        let schema = Schema::new(vec![PalletSchema::new(
            "system",
            0,
            vec![CallSchema::new(
                "noop",
                0,
                vec![ArgSlot::new("xs", ArgType::vec(ArgType::Composite(vec![])))],
            )],
        )])
        .unwrap();

        // compact length 2^26 followed by nothing
        let mut bytes = vec![0u8, 0];
        bytes.extend_from_slice(&Compact(1u32 << 26).encode());
        assert!(matches!(
            decode_call(&bytes, &schema),
            Err(Error::InvalidEncoding(_))
        ));

        // an empty list of such elements is still fine
        assert_eq!(
            decode_call(&[0, 0, 0], &schema).unwrap().args,
            vec![Value::Seq(vec![])]
        );
    }
}
