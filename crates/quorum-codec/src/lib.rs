//! Encoding and decoding of runtime calls for quorum.
//!
//! Calls are described by an explicitly loaded, immutable [`Schema`] table
//! mapping `(pallet index, call index)` to an ordered list of typed argument
//! slots. [`CallCodec`] walks that table to turn an [`OpaqueCall`] into its
//! canonical SCALE bytes and back; nested calls re-enter the same codec.

pub mod call;
pub mod reader;
pub mod schema;
pub mod value;

pub use call::{call_hash_of, decode_call, encode_call, CallCodec, MAX_CALL_DEPTH};
pub use reader::Reader;
pub use schema::{names, ArgSlot, ArgType, CallSchema, PalletSchema, Schema};
pub use value::{OpaqueCall, Value};
