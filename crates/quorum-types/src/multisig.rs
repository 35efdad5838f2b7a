//! Multisig bookkeeping types

use crate::address::AccountId32;
use crate::hashing::H256;
use parity_scale_codec::{Decode, Encode};
use quorum_errors::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// On-chain coordinate of the first approval of a pending multisig call
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Encode, Decode, Serialize, Deserialize,
)]
pub struct Timepoint {
    /// Block number the extrinsic was included in
    pub height: u32,
    /// Index of the extrinsic within that block
    pub index: u32,
}

impl Timepoint {
    pub fn new(height: u32, index: u32) -> Self {
        Self { height, index }
    }
}

impl fmt::Display for Timepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.height, self.index)
    }
}

/// Parses the `height-index` notation used by block explorers
impl FromStr for Timepoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (height, index) = s
            .split_once(['-', ':'])
            .ok_or_else(|| Error::InvalidEncoding(format!("timepoint {s}: expected height-index")))?;
        let height = height
            .trim()
            .parse()
            .map_err(|e| Error::InvalidEncoding(format!("timepoint height {height}: {e}")))?;
        let index = index
            .trim()
            .parse()
            .map_err(|e| Error::InvalidEncoding(format!("timepoint index {index}: {e}")))?;
        Ok(Self { height, index })
    }
}

/// Render an optional timepoint for error messages
pub fn describe_timepoint(timepoint: Option<&Timepoint>) -> String {
    match timepoint {
        Some(tp) => tp.to_string(),
        None => "none".to_string(),
    }
}

/// Local mirror of a multisig operation awaiting approvals
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMultisigCall {
    /// blake2_256 of the encoded inner call
    pub call_hash: H256,
    /// Where the initiating call was included, once known
    pub timepoint: Option<Timepoint>,
    /// Account that reserved the deposit
    pub depositor: AccountId32,
    /// Amount reserved from the depositor
    pub deposit: u128,
    /// Signatories that have approved so far, the depositor included
    pub approvals: BTreeSet<AccountId32>,
}

impl PendingMultisigCall {
    pub fn new(call_hash: H256, depositor: AccountId32, deposit: u128) -> Self {
        let mut approvals = BTreeSet::new();
        approvals.insert(depositor);
        Self {
            call_hash,
            timepoint: None,
            depositor,
            deposit,
            approvals,
        }
    }

    pub fn has_approved(&self, who: &AccountId32) -> bool {
        self.approvals.contains(who)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timepoint_display_and_parse() {
        let tp = Timepoint::new(1_024, 3);
        assert_eq!(tp.to_string(), "1024-3");
        assert_eq!("1024-3".parse::<Timepoint>().unwrap(), tp);
        assert_eq!("1024:3".parse::<Timepoint>().unwrap(), tp);
        assert!("1024".parse::<Timepoint>().is_err());
        assert!("a-3".parse::<Timepoint>().is_err());
    }

    #[test]
    fn test_timepoint_scale_layout() {
        let encoded = Timepoint::new(1, 2).encode();
        assert_eq!(encoded, vec![1, 0, 0, 0, 2, 0, 0, 0]);
    }

    #[test]
    fn test_pending_call_starts_with_depositor_approval() {
        let depositor = AccountId32::new([1; 32]);
        let pending = PendingMultisigCall::new(H256([9; 32]), depositor, 100);
        assert!(pending.has_approved(&depositor));
        assert_eq!(pending.approvals.len(), 1);
        assert!(pending.timepoint.is_none());
    }
}
