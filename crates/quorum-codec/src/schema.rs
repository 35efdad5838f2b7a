//! Call schema table
//!
//! A [`Schema`] maps `(pallet index, call index)` to a named call with an
//! ordered list of typed argument slots. Tables are loaded explicitly from a
//! JSON or TOML file, or taken from the built-in Polkadot subset, and are
//! immutable once constructed.

use quorum_errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Well-known pallet and call names of the built-in table
pub mod names {
    pub const BALANCES: &str = "balances";
    pub const TRANSFER: &str = "transfer";
    pub const TRANSFER_KEEP_ALIVE: &str = "transfer_keep_alive";

    pub const MULTISIG: &str = "multisig";
    pub const AS_MULTI_THRESHOLD_1: &str = "as_multi_threshold_1";
    pub const AS_MULTI: &str = "as_multi";
    pub const APPROVE_AS_MULTI: &str = "approve_as_multi";
    pub const CANCEL_AS_MULTI: &str = "cancel_as_multi";
}

/// Shape of a single argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    /// SCALE compact unsigned integer
    Compact,
    /// Raw 32-byte account id
    AccountId,
    /// `MultiAddress` enum
    MultiAddress,
    /// Compact-length-prefixed byte string
    Bytes,
    H256,
    Vec(Box<ArgType>),
    Option(Box<ArgType>),
    /// Fields encoded back to back in declaration order
    Composite(Vec<ArgSlot>),
    /// Nested call encoded inline
    Call,
    /// Nested call wrapped in a compact length prefix
    OpaqueCall,
}

impl ArgType {
    pub fn vec(inner: ArgType) -> Self {
        ArgType::Vec(Box::new(inner))
    }

    pub fn option(inner: ArgType) -> Self {
        ArgType::Option(Box::new(inner))
    }

    /// `{ height: u32, index: u32 }`
    pub fn timepoint() -> Self {
        ArgType::Composite(vec![
            ArgSlot::new("height", ArgType::U32),
            ArgSlot::new("index", ArgType::U32),
        ])
    }
}

/// Named argument slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSlot {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ArgType,
}

impl ArgSlot {
    pub fn new(name: impl Into<String>, ty: ArgType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A dispatchable call of a pallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSchema {
    pub name: String,
    pub index: u8,
    #[serde(default)]
    pub args: Vec<ArgSlot>,
}

impl CallSchema {
    pub fn new(name: impl Into<String>, index: u8, args: Vec<ArgSlot>) -> Self {
        Self {
            name: name.into(),
            index,
            args,
        }
    }

    /// Position of a named argument
    pub fn arg_position(&self, name: &str) -> Option<usize> {
        self.args.iter().position(|slot| slot.name == name)
    }
}

/// A pallet and its calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalletSchema {
    pub name: String,
    pub index: u8,
    #[serde(default)]
    pub calls: Vec<CallSchema>,
}

impl PalletSchema {
    pub fn new(name: impl Into<String>, index: u8, calls: Vec<CallSchema>) -> Self {
        Self {
            name: name.into(),
            index,
            calls,
        }
    }
}

#[derive(Deserialize)]
struct SchemaFile {
    pallets: Vec<PalletSchema>,
}

/// Immutable call table with lookups in both directions
#[derive(Debug, Clone)]
pub struct Schema {
    pallets: Vec<PalletSchema>,
    by_index: HashMap<(u8, u8), (usize, usize)>,
    by_name: HashMap<(String, String), (usize, usize)>,
}

impl Schema {
    /// Build a table, rejecting duplicate indices or names
    pub fn new(pallets: Vec<PalletSchema>) -> Result<Self> {
        let mut by_index = HashMap::new();
        let mut by_name = HashMap::new();
        let mut pallet_indices = HashMap::new();

        for (p, pallet) in pallets.iter().enumerate() {
            if let Some(other) = pallet_indices.insert(pallet.index, &pallet.name) {
                return Err(Error::SchemaMismatch(format!(
                    "pallet index {} used by both {} and {}",
                    pallet.index, other, pallet.name
                )));
            }
            for (c, call) in pallet.calls.iter().enumerate() {
                if by_index.insert((pallet.index, call.index), (p, c)).is_some() {
                    return Err(Error::SchemaMismatch(format!(
                        "duplicate call index {}/{}",
                        pallet.index, call.index
                    )));
                }
                if by_name
                    .insert((pallet.name.clone(), call.name.clone()), (p, c))
                    .is_some()
                {
                    return Err(Error::SchemaMismatch(format!(
                        "duplicate call name {}.{}",
                        pallet.name, call.name
                    )));
                }
            }
        }

        Ok(Self {
            pallets,
            by_index,
            by_name,
        })
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: SchemaFile = serde_json::from_str(content)
            .map_err(|e| Error::SchemaMismatch(format!("invalid schema json: {e}")))?;
        Self::new(file.pallets)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: SchemaFile = toml::from_str(content)
            .map_err(|e| Error::SchemaMismatch(format!("invalid schema toml: {e}")))?;
        Self::new(file.pallets)
    }

    /// Load a table from disk; `.toml` files are parsed as TOML, anything
    /// else as JSON
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::SchemaMismatch(format!("cannot read schema {}: {e}", path.display()))
        })?;
        let schema = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content)?,
            _ => Self::from_json(&content)?,
        };
        debug!(
            "loaded call schema from {} with {} calls",
            path.display(),
            schema.by_index.len()
        );
        Ok(schema)
    }

    /// Subset of the Polkadot runtime needed for transfers and multisig
    pub fn polkadot() -> Self {
        let other_signatories = || ArgSlot::new("other_signatories", ArgType::vec(ArgType::AccountId));
        let transfer_args = || {
            vec![
                ArgSlot::new("dest", ArgType::MultiAddress),
                ArgSlot::new("value", ArgType::Compact),
            ]
        };

        let pallets = vec![
            PalletSchema::new(
                names::BALANCES,
                5,
                vec![
                    CallSchema::new(names::TRANSFER, 0, transfer_args()),
                    CallSchema::new(names::TRANSFER_KEEP_ALIVE, 3, transfer_args()),
                ],
            ),
            PalletSchema::new(
                names::MULTISIG,
                30,
                vec![
                    CallSchema::new(
                        names::AS_MULTI_THRESHOLD_1,
                        0,
                        vec![other_signatories(), ArgSlot::new("call", ArgType::Call)],
                    ),
                    CallSchema::new(
                        names::AS_MULTI,
                        1,
                        vec![
                            ArgSlot::new("threshold", ArgType::U16),
                            other_signatories(),
                            ArgSlot::new("maybe_timepoint", ArgType::option(ArgType::timepoint())),
                            ArgSlot::new("call", ArgType::OpaqueCall),
                            ArgSlot::new("store_call", ArgType::Bool),
                            ArgSlot::new("max_weight", ArgType::U64),
                        ],
                    ),
                    CallSchema::new(
                        names::APPROVE_AS_MULTI,
                        2,
                        vec![
                            ArgSlot::new("threshold", ArgType::U16),
                            other_signatories(),
                            ArgSlot::new("maybe_timepoint", ArgType::option(ArgType::timepoint())),
                            ArgSlot::new("call_hash", ArgType::H256),
                            ArgSlot::new("max_weight", ArgType::U64),
                        ],
                    ),
                    CallSchema::new(
                        names::CANCEL_AS_MULTI,
                        3,
                        vec![
                            ArgSlot::new("threshold", ArgType::U16),
                            other_signatories(),
                            ArgSlot::new("timepoint", ArgType::timepoint()),
                            ArgSlot::new("call_hash", ArgType::H256),
                        ],
                    ),
                ],
            ),
        ];

        // indices and names above are distinct
        let mut by_index = HashMap::new();
        let mut by_name = HashMap::new();
        for (p, pallet) in pallets.iter().enumerate() {
            for (c, call) in pallet.calls.iter().enumerate() {
                by_index.insert((pallet.index, call.index), (p, c));
                by_name.insert((pallet.name.clone(), call.name.clone()), (p, c));
            }
        }
        Self {
            pallets,
            by_index,
            by_name,
        }
    }

    pub fn pallets(&self) -> &[PalletSchema] {
        &self.pallets
    }

    /// Resolve a call by its wire tag
    pub fn lookup_index(&self, pallet: u8, call: u8) -> Option<(&PalletSchema, &CallSchema)> {
        self.by_index
            .get(&(pallet, call))
            .map(|&(p, c)| (&self.pallets[p], &self.pallets[p].calls[c]))
    }

    /// Resolve a call by pallet and method name
    pub fn lookup_name(&self, pallet: &str, method: &str) -> Option<(&PalletSchema, &CallSchema)> {
        self.by_name
            .get(&(pallet.to_string(), method.to_string()))
            .map(|&(p, c)| (&self.pallets[p], &self.pallets[p].calls[c]))
    }

    /// Like [`Schema::lookup_name`], failing with `SchemaMismatch`
    pub fn require(&self, pallet: &str, method: &str) -> Result<(&PalletSchema, &CallSchema)> {
        self.lookup_name(pallet, method)
            .ok_or_else(|| Error::SchemaMismatch(format!("unknown call {pallet}.{method}")))
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::polkadot()
    }
}
