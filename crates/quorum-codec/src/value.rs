//! Dynamic argument values

use quorum_types::{AccountId32, MultiAddress, Timepoint, H256};
use serde::{Deserialize, Serialize};

/// A call in structured form: pallet and method names plus positional
/// arguments matching the schema slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueCall {
    pub pallet: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl OpaqueCall {
    pub fn new(pallet: impl Into<String>, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            pallet: pallet.into(),
            method: method.into(),
            args,
        }
    }
}

/// An argument value; which variant is accepted depends on the slot's
/// [`crate::ArgType`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    /// Any fixed-width or compact unsigned integer
    UInt(u128),
    AccountId(AccountId32),
    Address(MultiAddress),
    Bytes(#[serde(with = "hex_bytes")] Vec<u8>),
    Hash(H256),
    Seq(Vec<Value>),
    Option(Option<Box<Value>>),
    Composite(Vec<Value>),
    Call(Box<OpaqueCall>),
}

impl Value {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(bytes.into())
    }

    pub fn none() -> Self {
        Value::Option(None)
    }

    pub fn some(value: impl Into<Value>) -> Self {
        Value::Option(Some(Box::new(value.into())))
    }

    /// Short name of the variant for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::UInt(_) => "uint",
            Value::AccountId(_) => "account_id",
            Value::Address(_) => "address",
            Value::Bytes(_) => "bytes",
            Value::Hash(_) => "hash",
            Value::Seq(_) => "seq",
            Value::Option(_) => "option",
            Value::Composite(_) => "composite",
            Value::Call(_) => "call",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u128(&self) -> Option<u128> {
        match self {
            Value::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_account_id(&self) -> Option<&AccountId32> {
        match self {
            Value::AccountId(a) => Some(a),
            Value::Address(MultiAddress::Id(a)) => Some(a),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&H256> {
        match self {
            Value::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&OpaqueCall> {
        match self {
            Value::Call(call) => Some(call),
            _ => None,
        }
    }

    /// `Composite([height, index])` as a timepoint
    pub fn as_timepoint(&self) -> Option<Timepoint> {
        match self {
            Value::Composite(fields) if fields.len() == 2 => {
                let height = u32::try_from(fields[0].as_u128()?).ok()?;
                let index = u32::try_from(fields[1].as_u128()?).ok()?;
                Some(Timepoint::new(height, index))
            }
            _ => None,
        }
    }

    /// Inner value of an option slot, `None` for an empty option or a non
    /// option value
    pub fn as_option(&self) -> Option<&Value> {
        match self {
            Value::Option(Some(inner)) => Some(inner),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! uint_from {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::UInt(v as u128)
            }
        })*
    };
}

uint_from!(u8, u16, u32, u64, u128);

impl From<AccountId32> for Value {
    fn from(account: AccountId32) -> Self {
        Value::AccountId(account)
    }
}

impl From<MultiAddress> for Value {
    fn from(address: MultiAddress) -> Self {
        Value::Address(address)
    }
}

impl From<H256> for Value {
    fn from(hash: H256) -> Self {
        Value::Hash(hash)
    }
}

impl From<Timepoint> for Value {
    fn from(tp: Timepoint) -> Self {
        Value::Composite(vec![Value::UInt(tp.height as u128), Value::UInt(tp.index as u128)])
    }
}

impl From<OpaqueCall> for Value {
    fn from(call: OpaqueCall) -> Self {
        Value::Call(Box::new(call))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        Value::Option(opt.map(|v| Box::new(v.into())))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Seq(items.into_iter().map(Into::into).collect())
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}
