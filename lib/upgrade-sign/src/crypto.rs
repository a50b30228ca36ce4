// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Narrow interface over the secp256k1 primitives.
//!
//! Everything the protocol needs from the curve goes through this module:
//! compact signing and verification hash the raw message once with SHA-256;
//! the recoverable path used for external wallet signing follows the
//! Bitcoin message-signing convention (double SHA-256 over a prefixed,
//! length-tagged message) and carries the recovery id in a Base64 header
//! byte. The two hash disciplines are part of the format; do not unify
//! them.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use upgrade_format::section::{CompactSignature, Fingerprint};
use upgrade_format::{FINGERPRINT_LEN, SIGNATURE_LEN};

use crate::error::Error;

/// Length of a private key in bytes.
pub const SECKEY_LEN: usize = 32;
/// Length of an uncompressed public key in bytes (`0x04 ‖ X ‖ Y`).
pub const PUBKEY_LEN: usize = 65;

/// An uncompressed secp256k1 public key.
pub type PublicKey = [u8; PUBKEY_LEN];

/// Prefix of the Bitcoin message-signing convention; the leading byte is
/// the length of the magic string itself.
const MSG_SIGN_PREFIX: &[u8] = b"\x18Bitcoin Signed Message:\n";

fn signing_key(seckey: &[u8; SECKEY_LEN]) -> Result<SigningKey, Error> {
    SigningKey::from_slice(seckey).map_err(|_| Error::MalformedSecretKey)
}

fn encode_uncompressed(key: &VerifyingKey) -> PublicKey {
    let point = key.to_encoded_point(false);
    let mut out = [0u8; PUBKEY_LEN];
    out.copy_from_slice(point.as_bytes());
    out
}

/// Derives the uncompressed public key for a private key.
pub fn derive_pubkey(seckey: &[u8; SECKEY_LEN]) -> Result<PublicKey, Error> {
    let key = signing_key(seckey)?;
    Ok(encode_uncompressed(key.verifying_key()))
}

/// First 16 bytes of SHA-256 of the uncompressed public key.
pub fn fingerprint(pubkey: &PublicKey) -> Result<Fingerprint, Error> {
    if pubkey[0] != 0x04 {
        return Err(Error::MalformedPublicKey);
    }
    let digest = Sha256::digest(pubkey);
    let mut out = [0u8; FINGERPRINT_LEN];
    out.copy_from_slice(&digest[..FINGERPRINT_LEN]);
    Ok(out)
}

/// Fingerprint of the public key derived from a private key.
pub fn fingerprint_from_seckey(
    seckey: &[u8; SECKEY_LEN],
) -> Result<Fingerprint, Error> {
    fingerprint(&derive_pubkey(seckey)?)
}

/// Signs a message (hashed once with SHA-256), returning the compact
/// low-S-normalized signature.
pub fn sign(
    message: &[u8],
    seckey: &[u8; SECKEY_LEN],
) -> Result<CompactSignature, Error> {
    if message.is_empty() {
        return Err(Error::EmptyMessage);
    }
    let key = signing_key(seckey)?;
    let signature: Signature = key.sign(message);
    let signature = signature.normalize_s().unwrap_or(signature);
    let mut out = [0u8; SIGNATURE_LEN];
    out.copy_from_slice(&signature.to_bytes());
    Ok(out)
}

/// Verifies a compact signature over a message.
pub fn verify(
    signature: &CompactSignature,
    message: &[u8],
    pubkey: &PublicKey,
) -> bool {
    let Ok(key) = VerifyingKey::from_sec1_bytes(pubkey) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify(message, &signature).is_ok()
}

/// Bitcoin variable-length integer encoding.
fn compact_size(len: usize) -> Vec<u8> {
    match len {
        0..=0xfc => vec![len as u8],
        0xfd..=0xffff => {
            let mut out = vec![0xfd];
            out.extend_from_slice(&(len as u16).to_le_bytes());
            out
        }
        0x1_0000..=0xffff_ffff => {
            let mut out = vec![0xfe];
            out.extend_from_slice(&(len as u32).to_le_bytes());
            out
        }
        _ => {
            let mut out = vec![0xff];
            out.extend_from_slice(&(len as u64).to_le_bytes());
            out
        }
    }
}

/// Double SHA-256 over the prefixed, length-tagged message.
pub fn bitcoin_message_hash(message: &[u8]) -> [u8; 32] {
    let mut tagged = Vec::with_capacity(
        MSG_SIGN_PREFIX.len() + 9 + message.len(),
    );
    tagged.extend_from_slice(MSG_SIGN_PREFIX);
    tagged.extend_from_slice(&compact_size(message.len()));
    tagged.extend_from_slice(message);
    Sha256::digest(Sha256::digest(&tagged)).into()
}

/// Produces a standard Bitcoin message signature in Base64: one header
/// byte `27 + recovery_id + 4` (compressed key convention) followed by the
/// 64-byte compact signature.
pub fn sign_recoverable(
    message: &[u8],
    seckey: &[u8; SECKEY_LEN],
) -> Result<String, Error> {
    if message.is_empty() {
        return Err(Error::EmptyMessage);
    }
    let key = signing_key(seckey)?;
    let hash = bitcoin_message_hash(message);
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(&hash)
        .map_err(|_| Error::SigningFailed)?;
    let mut raw = Vec::with_capacity(1 + SIGNATURE_LEN);
    raw.push(27 + 4 + recovery_id.to_byte());
    raw.extend_from_slice(&signature.to_bytes());
    Ok(BASE64.encode(raw))
}

/// Parses a Base64 Bitcoin message signature and recovers the signer's
/// public key from it and the message. The caller never supplies the key:
/// it always comes out of the signature itself.
pub fn parse_recoverable(
    signature_b64: &str,
    message: &[u8],
) -> Result<(CompactSignature, PublicKey), Error> {
    let raw = BASE64
        .decode(signature_b64.trim())
        .map_err(|_| Error::MalformedSignature)?;
    if raw.len() != 1 + SIGNATURE_LEN {
        return Err(Error::MalformedSignature);
    }
    let header =
        raw[0].checked_sub(27).ok_or(Error::MalformedSignature)?;
    if header >= 8 {
        return Err(Error::MalformedSignature);
    }
    // Bit 2 of the header records whether the signer's key was compressed;
    // it does not affect recovery.
    let recovery_id = RecoveryId::from_byte(header % 4)
        .ok_or(Error::MalformedSignature)?;

    let mut compact = [0u8; SIGNATURE_LEN];
    compact.copy_from_slice(&raw[1..]);
    let signature = Signature::from_slice(&compact)
        .map_err(|_| Error::MalformedSignature)?;

    let hash = bitcoin_message_hash(message);
    let key = VerifyingKey::recover_from_prehash(&hash, &signature, recovery_id)
        .map_err(|_| Error::RecoveryFailed)?;
    Ok((compact, encode_uncompressed(&key)))
}
