//! Ed25519 key handling for manifest signing.
//!
//! The signing key is a 32-byte seed, delivered either base64-encoded in
//! an environment variable (`env:NAME`) or as raw bytes in a file. The
//! key value travels through the pipeline explicitly; `SigningKey`
//! zeroizes its seed on drop.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::Error;

/// Identifier recorded in the manifest `signing` block so consumers can
/// select the matching public key.
pub const DEFAULT_KEY_ID: &str = "pack-key-1";

/// A loaded signing key plus the key id it publishes under.
pub struct PackSigner {
    key: SigningKey,
    key_id: String,
}

impl PackSigner {
    pub fn new(key: SigningKey, key_id: impl Into<String>) -> Self {
        Self { key, key_id: key_id.into() }
    }

    /// Build a signer from a raw 32-byte seed.
    pub fn from_seed(seed: &[u8], key_id: impl Into<String>) -> Result<Self, Error> {
        let seed: [u8; 32] = seed
            .try_into()
            .map_err(|_| Error::KeyLoad(format!("seed is {} bytes, expected 32", seed.len())))?;
        Ok(Self::new(SigningKey::from_bytes(&seed), key_id))
    }

    #[inline]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Detached signature over `msg`, base64 standard alphabet with padding.
    pub fn sign_base64(&self, msg: &[u8]) -> String {
        BASE64.encode(self.key.sign(msg).to_bytes())
    }

    /// Base64 of the matching public key, the form `verify --public-key`
    /// accepts.
    pub fn public_key_base64(&self) -> String {
        BASE64.encode(self.key.verifying_key().to_bytes())
    }
}

/// Load a signing key from `env:NAME` (base64 seed in the environment) or
/// from a file path (raw seed bytes).
pub fn load_signing_key(spec: &str) -> Result<PackSigner, Error> {
    let seed = if let Some(name) = spec.strip_prefix("env:") {
        let b64 = std::env::var(name)
            .map_err(|_| Error::KeyLoad(format!("environment variable {name} not set")))?;
        BASE64
            .decode(b64.trim())
            .map_err(|e| Error::KeyLoad(format!("{name} is not valid base64: {e}")))?
    } else {
        std::fs::read(spec).map_err(|e| Error::KeyLoad(format!("read {spec}: {e}")))?
    };
    PackSigner::from_seed(&seed, DEFAULT_KEY_ID)
}

/// Verify a detached base64 signature against a base64 public key.
pub fn verify_detached(public_key_b64: &str, msg: &[u8], sig_b64: &str) -> Result<(), Error> {
    let key_bytes = BASE64
        .decode(public_key_b64.trim())
        .map_err(|e| Error::BadSignature(format!("public key is not valid base64: {e}")))?;
    let key_bytes: [u8; 32] = key_bytes
        .as_slice()
        .try_into()
        .map_err(|_| Error::BadSignature(format!("public key is {} bytes, expected 32", key_bytes.len())))?;
    let key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| Error::BadSignature(format!("bad public key: {e}")))?;

    let sig = decode_signature(sig_b64)?;
    key.verify(msg, &sig)
        .map_err(|_| Error::BadSignature("signature does not match manifest".into()))
}

/// Decode a base64 signature, checking the 64-byte Ed25519 length. Used
/// both by full verification and by format-only checks when no public key
/// is available.
pub(crate) fn decode_signature(sig_b64: &str) -> Result<Signature, Error> {
    let bytes = BASE64
        .decode(sig_b64.trim())
        .map_err(|e| Error::BadSignature(format!("signature is not valid base64: {e}")))?;
    let bytes: [u8; 64] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| Error::BadSignature(format!("signature is {} bytes, expected 64", bytes.len())))?;
    Ok(Signature::from_bytes(&bytes))
}
