//! secp256k1 ECDSA operations: keypairs, the spend-signing message, and
//! signature verification.
//!
//! # Signing scheme
//!
//! `build_spend_message(outpoint, pk, sequence, txouts) =
//! sha256d(serialize(outpoint) || sequence || pk || serialize(txouts))`.
//!
//! This is the node's analog of `SIGHASH_ALL`: one signature commits to the
//! specific outpoint being spent, the signer's public key, the input's
//! sequence number, and all of the transaction's outputs. Changing any output
//! value or address changes `serialize(txouts)` and therefore invalidates
//! every existing signature on the transaction's inputs.

use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey as Secp256k1PublicKey, Secp256k1, SecretKey};

use crate::address::pubkey_to_address;
use crate::codec;
use crate::error::CryptoError;
use crate::types::{Address, OutPoint, TxOut};

/// A secp256k1 keypair, used by the wallet to sign spends.
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: Secp256k1PublicKey,
}

impl KeyPair {
    /// Generate a random keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let mut rng = rand::rngs::OsRng;
        let (secret_key, public_key) = secp.generate_keypair(&mut rng);
        Self { secret_key, public_key }
    }

    /// Reconstruct a keypair from 32 bytes of secret key material (as read
    /// from the wallet file).
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        let secp = Secp256k1::new();
        let public_key = Secp256k1PublicKey::from_secret_key(&secp, &secret_key);
        Ok(Self { secret_key, public_key })
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret_key.secret_bytes()
    }

    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key.serialize().to_vec()
    }

    pub fn address(&self) -> Address {
        pubkey_to_address(&self.public_key_bytes())
    }

    /// Sign a 32-byte message digest with this keypair.
    pub fn sign(&self, digest: &[u8; 32]) -> Signature {
        let secp = Secp256k1::signing_only();
        let message = Message::from_digest(*digest);
        secp.sign_ecdsa(&message, &self.secret_key)
    }
}

/// `sha256d(serialize(outpoint) || sequence || pk || serialize(txouts))`.
pub fn build_spend_message(outpoint: &OutPoint, pk: &[u8], sequence: u32, txouts: &[TxOut]) -> [u8; 32] {
    let mut data = Vec::new();
    data.extend_from_slice(&codec::to_canonical_bytes(outpoint));
    data.extend_from_slice(&sequence.to_be_bytes());
    data.extend_from_slice(pk);
    for txout in txouts {
        data.extend_from_slice(&codec::to_canonical_bytes(txout));
    }
    *crate::types::sha256d(&data).as_bytes()
}

/// Verify `unlock_sig` over `build_spend_message(..)` using `unlock_pk`.
///
/// Does not check address ownership — callers compare the address derived
/// from `unlock_pk` against the UTXO's `to_address` separately (see
/// [`crate::validation`]), since that check belongs to validation, not crypto.
pub fn verify_spend(
    outpoint: &OutPoint,
    unlock_pk: &[u8],
    sequence: u32,
    txouts: &[TxOut],
    unlock_sig: &[u8],
) -> Result<(), CryptoError> {
    let pk = Secp256k1PublicKey::from_slice(unlock_pk).map_err(|_| CryptoError::InvalidPublicKey)?;
    let sig = Signature::from_der(unlock_sig)
        .or_else(|_| Signature::from_compact(unlock_sig))
        .map_err(|_| CryptoError::InvalidSignature)?;
    let digest = build_spend_message(outpoint, unlock_pk, sequence, txouts);
    let message = Message::from_digest(digest);
    let secp = Secp256k1::verification_only();
    secp.verify_ecdsa(&message, &sig, &pk)
        .map_err(|_| CryptoError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, Hash256};

    fn sample_outpoint() -> OutPoint {
        OutPoint { txid: Hash256::ZERO, txout_idx: 0 }
    }

    fn sample_txouts() -> Vec<TxOut> {
        vec![TxOut { value: 10, to_address: Address("addr".to_string()) }]
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let kp = KeyPair::generate();
        let pk = kp.public_key_bytes();
        let outpoint = sample_outpoint();
        let txouts = sample_txouts();
        let digest = build_spend_message(&outpoint, &pk, 0, &txouts);
        let sig = kp.sign(&digest);
        let result = verify_spend(&outpoint, &pk, 0, &txouts, &sig.serialize_der());
        assert!(result.is_ok());
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        let outpoint = sample_outpoint();
        let txouts = sample_txouts();
        let digest = build_spend_message(&outpoint, &kp.public_key_bytes(), 0, &txouts);
        let sig = kp.sign(&digest);
        let result = verify_spend(&outpoint, &other.public_key_bytes(), 0, &txouts, &sig.serialize_der());
        assert!(result.is_err());
    }

    #[test]
    fn changing_any_output_invalidates_signature() {
        let kp = KeyPair::generate();
        let pk = kp.public_key_bytes();
        let outpoint = sample_outpoint();
        let mut txouts = sample_txouts();
        let digest = build_spend_message(&outpoint, &pk, 0, &txouts);
        let sig = kp.sign(&digest);
        txouts[0].value += 1;
        let result = verify_spend(&outpoint, &pk, 0, &txouts, &sig.serialize_der());
        assert!(result.is_err());
    }

    #[test]
    fn changing_sequence_invalidates_signature() {
        let kp = KeyPair::generate();
        let pk = kp.public_key_bytes();
        let outpoint = sample_outpoint();
        let txouts = sample_txouts();
        let digest = build_spend_message(&outpoint, &pk, 0, &txouts);
        let sig = kp.sign(&digest);
        let result = verify_spend(&outpoint, &pk, 1, &txouts, &sig.serialize_der());
        assert!(result.is_err());
    }

    #[test]
    fn keypair_roundtrips_through_secret_bytes() {
        let kp = KeyPair::generate();
        let bytes = kp.secret_bytes();
        let restored = KeyPair::from_secret_bytes(&bytes).unwrap();
        assert_eq!(kp.public_key_bytes(), restored.public_key_bytes());
    }

    #[test]
    fn address_is_derived_from_public_key() {
        let kp = KeyPair::generate();
        assert_eq!(kp.address(), pubkey_to_address(&kp.public_key_bytes()));
    }
}
