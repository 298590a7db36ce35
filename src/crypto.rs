use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use ed25519_dalek::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};

// Fixed sizes for ed25519 material carried over the wire as base64.
pub const PUBLIC_KEY_BYTES: usize = 32;
pub const SIGNATURE_BYTES: usize = 64;

pub const WALLET_PREFIX: &str = "HNY_";
/// Hex characters following the prefix: the first 20 bytes of the key digest.
pub const WALLET_HEX_LEN: usize = 40;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Lowercase hex SHA-256, the encoding used for every ledger hash.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Derives the wallet address for raw public key bytes:
/// `HNY_` followed by the hex of the first 20 bytes of `sha256(pk)`.
pub fn wallet_from_pk(pk: &[u8; PUBLIC_KEY_BYTES]) -> String {
    let digest = sha256(pk);
    format!("{WALLET_PREFIX}{}", hex::encode(&digest[..WALLET_HEX_LEN / 2]))
}

pub fn is_wallet_address(s: &str) -> bool {
    match s.strip_prefix(WALLET_PREFIX) {
        Some(rest) => {
            rest.len() == WALLET_HEX_LEN
                && rest.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        }
        None => false,
    }
}

/// Decodes base64 into exactly `N` bytes; anything else is `None`.
pub fn decode_fixed<const N: usize>(b64: &str) -> Option<[u8; N]> {
    let raw = B64.decode(b64.trim().as_bytes()).ok()?;
    raw.try_into().ok()
}

pub fn decode_public_key(b64: &str) -> Option<VerifyingKey> {
    let bytes = decode_fixed::<PUBLIC_KEY_BYTES>(b64)?;
    VerifyingKey::from_bytes(&bytes).ok()
}

pub fn decode_signature(b64: &str) -> Option<Signature> {
    decode_fixed::<SIGNATURE_BYTES>(b64).map(|bytes| Signature::from_bytes(&bytes))
}

pub fn encode_b64(bytes: &[u8]) -> String {
    B64.encode(bytes)
}
