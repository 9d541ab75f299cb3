//! EJSON decryption.
//!
//! An EJSON file is a JSON object with a `_public_key` field. Each string
//! value is stored as `EJ[1:<encrypter key>:<nonce>:<box>]` (base64 parts,
//! NaCl box). String values under keys starting with `_` stay in plaintext.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use camino::{Utf8Path, Utf8PathBuf};
use crypto_box::aead::Aead;
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use serde_json::Value;

use super::{DecryptFailure, Decrypter, KeyMaterial};

/// Key directory consulted when no key material is configured.
pub const DEFAULT_KEY_DIR: &str = "/opt/ejson/keys";

const PUBLIC_KEY_FIELD: &str = "_public_key";
const MESSAGE_PREFIX: &str = "EJ[1:";
const NONCE_LEN: usize = 24;

/// [`Decrypter`] for EJSON files.
#[derive(Clone, Debug)]
pub struct EjsonDecrypter {
    key_dir: Utf8PathBuf,
}

impl Default for EjsonDecrypter {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_DIR)
    }
}

impl EjsonDecrypter {
    /// Build a decrypter that falls back to keys stored in `key_dir`.
    #[must_use]
    pub fn new(key_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            key_dir: key_dir.into(),
        }
    }

    /// Directory searched for `<public key>` files.
    #[must_use]
    pub fn key_dir(&self) -> &Utf8Path {
        &self.key_dir
    }

    fn private_key(
        &self,
        public_hex: &str,
        key: Option<&KeyMaterial>,
    ) -> Result<[u8; 32], DecryptFailure> {
        match key.filter(|material| !material.is_blank()) {
            Some(material) => parse_key(material.expose()).ok_or(DecryptFailure::InvalidPrivateKey),
            None => {
                let not_found = || DecryptFailure::KeyNotFound {
                    public_key: public_hex.to_owned(),
                    key_dir: self.key_dir.clone(),
                };
                let stored = std::fs::read_to_string(self.key_dir.join(public_hex))
                    .map_err(|_| not_found())?;
                parse_key(&stored).ok_or(DecryptFailure::InvalidPrivateKey)
            }
        }
    }
}

impl Decrypter for EjsonDecrypter {
    fn decrypt(
        &self,
        _path: &Utf8Path,
        ciphertext: &[u8],
        key: Option<&KeyMaterial>,
    ) -> Result<Vec<u8>, DecryptFailure> {
        let mut document: Value =
            serde_json::from_slice(ciphertext).map_err(|_| DecryptFailure::InvalidDocument)?;
        if !document.is_object() {
            return Err(DecryptFailure::InvalidDocument);
        }
        let public_hex = document
            .get(PUBLIC_KEY_FIELD)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(DecryptFailure::MissingPublicKey)?;
        let public = parse_key(&public_hex).ok_or(DecryptFailure::InvalidPublicKey)?;
        let secret = SecretKey::from(self.private_key(&public_hex, key)?);
        if secret.public_key().as_bytes() != &public {
            return Err(DecryptFailure::KeyMismatch);
        }

        decrypt_tree(&mut document, &secret)?;
        serde_json::to_vec_pretty(&document).map_err(|_| DecryptFailure::Render)
    }
}

fn parse_key(encoded: &str) -> Option<[u8; 32]> {
    hex::decode(encoded.trim())
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
}

fn decrypt_tree(value: &mut Value, secret: &SecretKey) -> Result<(), DecryptFailure> {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key.starts_with('_') && child.is_string() {
                    continue;
                }
                decrypt_tree(child, secret)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                decrypt_tree(item, secret)?;
            }
        }
        Value::String(text) => *text = open_message(text, secret)?,
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}

fn open_message(message: &str, secret: &SecretKey) -> Result<String, DecryptFailure> {
    let body = message
        .trim()
        .strip_prefix(MESSAGE_PREFIX)
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or(DecryptFailure::MalformedMessage)?;
    let mut parts = body.split(':');
    let (Some(encrypter_b64), Some(nonce_b64), Some(sealed_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(DecryptFailure::MalformedMessage);
    };

    let encrypter: [u8; 32] = decode_exact(encrypter_b64)?;
    let nonce: [u8; NONCE_LEN] = decode_exact(nonce_b64)?;
    let sealed = STANDARD
        .decode(sealed_b64)
        .map_err(|_| DecryptFailure::MalformedMessage)?;

    let salsa = SalsaBox::new(&PublicKey::from(encrypter), secret);
    let plaintext = salsa
        .decrypt(&nonce.into(), sealed.as_slice())
        .map_err(|_| DecryptFailure::AuthenticationFailed)?;
    String::from_utf8(plaintext).map_err(|_| DecryptFailure::NonUtf8Plaintext)
}

fn decode_exact<const N: usize>(encoded: &str) -> Result<[u8; N], DecryptFailure> {
    STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(DecryptFailure::MalformedMessage)
}
