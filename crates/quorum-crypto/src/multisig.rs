//! Multisig account derivation

use parity_scale_codec::{Compact, Encode};
use quorum_errors::{Error, Result};
use quorum_types::{blake2_256, decode_address, encode_address, AccountId32};
use tracing::debug;

/// Domain separation prefix of multisig account ids
pub const MULTISIG_PREFIX: &[u8] = b"modlpy/utilisuba";

/// Derive the multisig account id for a signer set and threshold
///
/// `blake2_256(prefix ++ compact(n) ++ sorted signatories ++ u16_le(threshold))`.
/// The result does not depend on the order of `signatories`.
pub fn derive_multisig_account(signatories: &[AccountId32], threshold: u16) -> Result<AccountId32> {
    let n = signatories.len();
    if threshold < 2 || threshold as usize > n {
        return Err(Error::InvalidThreshold {
            threshold: threshold as usize,
            signatories: n,
        });
    }

    let mut sorted = signatories.to_vec();
    sorted.sort();
    if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(Error::DuplicateSignatory(pair[0].to_string()));
    }

    let mut data = Vec::with_capacity(MULTISIG_PREFIX.len() + 5 + 32 * n + 2);
    data.extend_from_slice(MULTISIG_PREFIX);
    Compact(n as u32).encode_to(&mut data);
    for account in &sorted {
        data.extend_from_slice(account.as_bytes());
    }
    data.extend_from_slice(&threshold.to_le_bytes());

    let account = AccountId32::new(blake2_256(&data));
    debug!("derived {}-of-{} multisig account {}", threshold, n, account.to_hex());
    Ok(account)
}

/// Derive the multisig address from SS58 signatory addresses
pub fn derive_multisig_address<S: AsRef<str>>(
    addresses: &[S],
    threshold: u16,
    ss58_format: u16,
) -> Result<String> {
    let signatories = addresses
        .iter()
        .map(|address| decode_address(address.as_ref()).map(|(account, _)| account))
        .collect::<Result<Vec<_>>>()?;
    let account = derive_multisig_account(&signatories, threshold)?;
    Ok(encode_address(&account, ss58_format))
}
