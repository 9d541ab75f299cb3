//! Deterministic EJSON fixtures.
//!
//! Keys are derived from fixed seeds so fixtures are reproducible. Nonces
//! come from a per-pair counter; never use these helpers outside tests.

use std::cell::Cell;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use camino::Utf8Path;
use crypto_box::aead::Aead;
use crypto_box::{SalsaBox, SecretKey};
use serde_json::Value;

const EPHEMERAL_SEED: [u8; 32] = [0x5a; 32];

/// A fixed key pair able to seal EJSON values.
pub struct TestKeyPair {
    private: [u8; 32],
    secret: SecretKey,
    counter: Cell<u8>,
}

impl TestKeyPair {
    /// Builds the key pair whose private key is 32 copies of `seed`.
    #[must_use]
    pub fn from_seed(seed: u8) -> Self {
        Self {
            private: [seed; 32],
            secret: SecretKey::from([seed; 32]),
            counter: Cell::new(0),
        }
    }

    /// Hex-encoded public key, as stored in `_public_key`.
    #[must_use]
    pub fn public_hex(&self) -> String {
        hex::encode(self.secret.public_key().as_bytes())
    }

    /// Hex-encoded private key, as supplied through `EJSON_SECRET`.
    #[must_use]
    pub fn private_hex(&self) -> String {
        hex::encode(self.private)
    }

    /// Seals `plaintext` into an `EJ[1:...]` message.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails.
    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let ephemeral = SecretKey::from(EPHEMERAL_SEED);
        let salsa = SalsaBox::new(&self.secret.public_key(), &ephemeral);
        let nonce = [self.next_nonce_byte(); 24];
        let sealed = salsa
            .encrypt(&nonce.into(), plaintext.as_bytes())
            .map_err(|_| anyhow!("sealing failed"))?;
        Ok(format!(
            "EJ[1:{}:{}:{}]",
            STANDARD.encode(ephemeral.public_key().as_bytes()),
            STANDARD.encode(nonce),
            STANDARD.encode(sealed)
        ))
    }

    /// Renders `plain` as an EJSON document for this key pair.
    ///
    /// `_public_key` is added and every string whose key does not start with
    /// `_` is sealed.
    ///
    /// # Errors
    ///
    /// Returns an error if `plain` is not an object or sealing fails.
    pub fn document(&self, plain: &Value) -> Result<String> {
        let mut document = plain.clone();
        let map = document
            .as_object_mut()
            .ok_or_else(|| anyhow!("EJSON documents must be objects"))?;
        map.insert("_public_key".to_owned(), Value::String(self.public_hex()));
        self.seal_tree(&mut document)?;
        serde_json::to_string_pretty(&document).context("render EJSON document")
    }

    /// Stores the private key under `key_dir/<public key>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key file cannot be written.
    pub fn install(&self, key_dir: &Utf8Path) -> Result<()> {
        std::fs::create_dir_all(key_dir).with_context(|| format!("create {key_dir}"))?;
        let path = key_dir.join(self.public_hex());
        std::fs::write(&path, self.private_hex()).with_context(|| format!("write {path}"))
    }

    fn seal_tree(&self, value: &mut Value) -> Result<()> {
        match value {
            Value::Object(map) => {
                for (key, child) in map.iter_mut() {
                    if key.starts_with('_') && child.is_string() {
                        continue;
                    }
                    self.seal_tree(child)?;
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.seal_tree(item)?;
                }
            }
            Value::String(text) => *text = self.seal(text)?,
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
        Ok(())
    }

    fn next_nonce_byte(&self) -> u8 {
        let next = self.counter.get().wrapping_add(1);
        self.counter.set(next);
        next
    }
}
