use anyhow::{anyhow, Result};
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;

use crate::crypto;
use crate::ledger::{MintRequest, SendRequest};
use crate::signature::canonical_message;
use crate::transaction::TxType;

/// Client-side ed25519 identity that produces correctly signed requests.
/// The node itself never holds secret keys; this is used by the CLI and tests.
pub struct Wallet {
    sk: SigningKey,
    address: String,
}

impl Wallet {
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(&seed))
    }

    /// Restores a wallet from the base64 secret printed by `keygen`.
    pub fn from_secret_b64(secret: &str) -> Result<Self> {
        let seed = crypto::decode_fixed::<32>(secret)
            .ok_or_else(|| anyhow!("secret must be base64 of 32 bytes"))?;
        Ok(Self::from_seed(seed))
    }

    fn from_signing_key(sk: SigningKey) -> Self {
        let address = crypto::wallet_from_pk(sk.verifying_key().as_bytes());
        Self { sk, address }
    }

    pub fn address(&self) -> String {
        self.address.clone()
    }

    pub fn public_key_b64(&self) -> String {
        crypto::encode_b64(self.sk.verifying_key().as_bytes())
    }

    pub fn secret_b64(&self) -> String {
        crypto::encode_b64(&self.sk.to_bytes())
    }

    /// Base64 detached signature over `message`.
    pub fn sign(&self, message: &str) -> String {
        crypto::encode_b64(&self.sk.sign(message.as_bytes()).to_bytes())
    }

    pub fn mint_request(&self, mint_amount: u64, nonce: u64, timestamp: u64) -> MintRequest {
        let msg = canonical_message(TxType::Mint, None, &self.address, mint_amount, nonce, timestamp);
        MintRequest {
            wallet: self.address(),
            nonce,
            timestamp,
            signature: self.sign(&msg),
        }
    }

    pub fn send_request(&self, to: &str, amount: u64, nonce: u64, timestamp: u64) -> SendRequest {
        let msg = canonical_message(TxType::Send, Some(&self.address), to, amount, nonce, timestamp);
        SendRequest {
            from: self.address(),
            to: to.to_string(),
            amount,
            nonce,
            timestamp,
            signature: self.sign(&msg),
        }
    }
}
