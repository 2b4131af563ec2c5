//! Cryptographic operations.
//!
//! - Ed25519 for transaction signatures
//! - SHA-256 for address derivation
//! - BLAKE3 for the state commitment
//!
//! Nothing here reads randomness; keys are derived from explicit seeds.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::types::{Hash, PubKey, SIGNATURE_LEN};

/// Compute BLAKE3 hash of the input data.
pub fn hash_blake3(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Compute SHA-256 hash of the input data.
pub fn hash_sha256(data: &[u8]) -> Hash {
    use sha2::Digest;
    let result = sha2::Sha256::digest(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Verify an Ed25519 signature. An undecodable public key verifies nothing.
pub fn verify_ed25519(message: &[u8], signature: &[u8; SIGNATURE_LEN], public_key: &PubKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key.as_bytes()) else {
        return false;
    };
    let sig = Signature::from_bytes(signature);
    verifying_key.verify(message, &sig).is_ok()
}

/// Sign a message with an Ed25519 private key.
pub fn sign_ed25519(message: &[u8], secret_key: &SigningKey) -> [u8; SIGNATURE_LEN] {
    secret_key.sign(message).to_bytes()
}

/// Deterministic keypair whose secret is `[seed; 32]`.
pub fn keypair_from_seed(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

/// Public key of a signing key in ledger form.
pub fn pub_key_of(secret_key: &SigningKey) -> PubKey {
    PubKey::from(&secret_key.verifying_key())
}
