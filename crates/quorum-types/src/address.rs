//! Account identities and the SS58 address codec

use crate::hashing::blake2_512;
use crate::SUBSTRATE_SS58_FORMAT;
use parity_scale_codec::{Decode, Encode};
use quorum_errors::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const SS58_CHECKSUM_PREFIX: &[u8] = b"SS58PRE";
const SS58_CHECKSUM_LEN: usize = 2;
const MAX_SS58_FORMAT: u16 = 0b0011_1111_1111_1111;

/// Account identity - 32 bytes
///
/// For Ed25519 and Sr25519 signers this is the public key itself; for ECDSA
/// it is the blake2_256 of the compressed public key; for multisig accounts
/// it is the derived hash.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub struct AccountId32([u8; 32]);

impl AccountId32 {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build from a raw slice, which must be exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            Error::InvalidAddress(format!("expected 32 account bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode to SS58 with the given network format
    pub fn to_ss58(&self, format: u16) -> String {
        encode_address(self, format)
    }

    /// Parse an SS58 string, returning the account and its network format
    pub fn from_ss58(s: &str) -> Result<(Self, u16), Error> {
        decode_address(s)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for AccountId32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AccountId32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for AccountId32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ss58(SUBSTRATE_SS58_FORMAT))
    }
}

impl fmt::Debug for AccountId32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId32({})", self.to_hex())
    }
}

/// Accepts either an SS58 address or 0x-prefixed hex of the 32 raw bytes
impl FromStr for AccountId32 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(stripped) = s.strip_prefix("0x") {
            let raw = hex::decode(stripped)
                .map_err(|e| Error::InvalidAddress(format!("{s}: {e}")))?;
            return Self::from_slice(&raw);
        }
        let (account, _) = decode_address(s)?;
        Ok(account)
    }
}

impl Serialize for AccountId32 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountId32 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Transaction address, as used for the signer of an extrinsic and for
/// transfer destinations
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum MultiAddress {
    Id(AccountId32),
    Index(#[codec(compact)] u32),
    Raw(Vec<u8>),
    Address32([u8; 32]),
    Address20([u8; 20]),
}

impl From<AccountId32> for MultiAddress {
    fn from(account: AccountId32) -> Self {
        MultiAddress::Id(account)
    }
}

fn ss58_checksum(prefix_and_body: &[u8]) -> [u8; 64] {
    let mut data = Vec::with_capacity(SS58_CHECKSUM_PREFIX.len() + prefix_and_body.len());
    data.extend_from_slice(SS58_CHECKSUM_PREFIX);
    data.extend_from_slice(prefix_and_body);
    blake2_512(&data)
}

fn ss58_prefix(format: u16) -> Vec<u8> {
    if format < 64 {
        vec![format as u8]
    } else {
        let first = (((format & 0b0000_0000_1111_1100) as u8) >> 2) | 0b0100_0000;
        let second = ((format >> 8) as u8) | (((format & 0b0000_0000_0000_0011) as u8) << 6);
        vec![first, second]
    }
}

/// Encode an account with the given SS58 network format
///
/// Formats above 16383 are not representable and are masked to 14 bits.
pub fn encode_address(account: &AccountId32, format: u16) -> String {
    let mut data = ss58_prefix(format & MAX_SS58_FORMAT);
    data.extend_from_slice(account.as_bytes());
    let checksum = ss58_checksum(&data);
    data.extend_from_slice(&checksum[..SS58_CHECKSUM_LEN]);
    bs58::encode(data).into_string()
}

/// Decode an SS58 address into its account and network format
pub fn decode_address(address: &str) -> Result<(AccountId32, u16), Error> {
    let data = bs58::decode(address)
        .into_vec()
        .map_err(|e| Error::InvalidAddress(format!("{address}: {e}")))?;

    let (prefix_len, format) = match data.first() {
        Some(&b) if b < 64 => (1, b as u16),
        Some(&b) if b < 128 => {
            let second = *data
                .get(1)
                .ok_or_else(|| Error::InvalidAddress(format!("{address}: truncated prefix")))?;
            let lower = (b << 2) | (second >> 6);
            let upper = second & 0b0011_1111;
            (2, (lower as u16) | ((upper as u16) << 8))
        }
        Some(b) => {
            return Err(Error::InvalidAddress(format!(
                "{address}: reserved prefix byte {b}"
            )))
        }
        None => return Err(Error::InvalidAddress("empty address".to_string())),
    };

    if data.len() != prefix_len + 32 + SS58_CHECKSUM_LEN {
        return Err(Error::InvalidAddress(format!(
            "{address}: unexpected length {}",
            data.len()
        )));
    }

    let body_end = prefix_len + 32;
    let checksum = ss58_checksum(&data[..body_end]);
    if data[body_end..] != checksum[..SS58_CHECKSUM_LEN] {
        return Err(Error::InvalidAddress(format!("{address}: bad checksum")));
    }

    let account = AccountId32::from_slice(&data[prefix_len..body_end])?;
    Ok((account, format))
}

/// Sort addresses ascending by their underlying account bytes and re-encode
/// them in `format`
pub fn sort_addresses<S: AsRef<str>>(addresses: &[S], format: u16) -> Result<Vec<String>, Error> {
    let mut accounts = addresses
        .iter()
        .map(|a| a.as_ref().parse::<AccountId32>())
        .collect::<Result<Vec<_>, _>>()?;
    accounts.sort();
    Ok(accounts.iter().map(|a| a.to_ss58(format)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::POLKADOT_SS58_FORMAT;

    const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
    const ALICE_HEX: &str = "d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";
    const ALICE_POLKADOT: &str = "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5";
    const BOB: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";
    const DAVE: &str = "5DAAnrj7VHTznn2AWBemMuyBwZWs6FNFjdyVXUeYum3PTXFy";

    #[test]
    fn test_decode_known_address() {
        let (account, format) = decode_address(ALICE).unwrap();
        assert_eq!(format, SUBSTRATE_SS58_FORMAT);
        assert_eq!(hex::encode(account.as_bytes()), ALICE_HEX);
    }

    #[test]
    fn test_reencode_with_other_format() {
        let (account, _) = decode_address(ALICE).unwrap();
        assert_eq!(account.to_ss58(POLKADOT_SS58_FORMAT), ALICE_POLKADOT);
        assert_eq!(account.to_ss58(SUBSTRATE_SS58_FORMAT), ALICE);
    }

    #[test]
    fn test_two_byte_prefix_roundtrip() {
        let account = AccountId32::new([7u8; 32]);
        for format in [64u16, 255, 1284, 16383] {
            let encoded = account.to_ss58(format);
            let (decoded, decoded_format) = decode_address(&encoded).unwrap();
            assert_eq!(decoded, account);
            assert_eq!(decoded_format, format);
        }
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let mut corrupted = ALICE.to_string();
        corrupted.replace_range(10..11, "z");
        assert!(matches!(
            decode_address(&corrupted),
            Err(Error::InvalidAddress(_))
        ));
        assert!(decode_address("").is_err());
        assert!(decode_address("0OIl").is_err());
    }

    #[test]
    fn test_sort_addresses_by_public_key() {
        let sorted = sort_addresses(&[ALICE, BOB, DAVE], SUBSTRATE_SS58_FORMAT).unwrap();
        // Dave (0x3067..) < Bob (0x8eaf..) < Alice (0xd435..)
        assert_eq!(sorted, vec![DAVE, BOB, ALICE]);
    }

    #[test]
    fn test_from_str_accepts_hex() {
        let from_hex: AccountId32 = format!("0x{ALICE_HEX}").parse().unwrap();
        let from_ss58: AccountId32 = ALICE.parse().unwrap();
        assert_eq!(from_hex, from_ss58);
        assert!("0x1234".parse::<AccountId32>().is_err());
    }

    #[test]
    fn test_multi_address_encoding() {
        let account: AccountId32 = ALICE.parse().unwrap();
        let encoded = MultiAddress::Id(account).encode();
        assert_eq!(encoded[0], 0);
        assert_eq!(&encoded[1..], account.as_bytes());

        let index = MultiAddress::Index(1).encode();
        assert_eq!(index, vec![1, 4]);
        assert_eq!(
            MultiAddress::decode(&mut &index[..]).unwrap(),
            MultiAddress::Index(1)
        );
    }
}
