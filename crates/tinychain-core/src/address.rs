//! Address derivation: `base58check(0x00 || RIPEMD160(SHA256(pubkey)))`.
//!
//! Hex/base58 encoding itself is an external collaborator (the `bs58` crate);
//! this module only defines how a public key maps to the 20-byte payload and
//! how the version byte and checksum wrap it.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::constants::ADDRESS_VERSION_BYTE;
use crate::error::AddressError;
use crate::types::Address;

/// `RIPEMD160(SHA256(pubkey))`.
pub fn pubkey_hash(pubkey_bytes: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(pubkey_bytes);
    let ripe = Ripemd160::digest(sha);
    ripe.into()
}

/// Derive the base58check address for a (compressed or uncompressed) public key.
pub fn pubkey_to_address(pubkey_bytes: &[u8]) -> Address {
    let hash = pubkey_hash(pubkey_bytes);
    let mut payload = Vec::with_capacity(21);
    payload.push(ADDRESS_VERSION_BYTE);
    payload.extend_from_slice(&hash);
    let encoded = bs58::encode(payload).with_check().into_string();
    Address(encoded)
}

/// Decode a base58check address back to its 20-byte pubkey hash, verifying
/// the checksum and version byte along the way.
pub fn decode_address(address: &str) -> Result<[u8; 20], AddressError> {
    let bytes = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|_| AddressError::InvalidBase58)?;
    let (version, payload) = bytes.split_first().ok_or(AddressError::WrongLength(0))?;
    if *version != ADDRESS_VERSION_BYTE {
        return Err(AddressError::WrongVersion(*version));
    }
    payload
        .try_into()
        .map_err(|_| AddressError::WrongLength(payload.len()))
}
