//! Request envelopes and the payload codec.
//!
//! Status queries go out as plain JSON. Control commands are encrypted, Base64
//! encoded and signed, then prefixed with the protocol version:
//! `version ++ md5[8..24] ++ base64(AES-128-ECB(PKCS7(json)))`.
//! Devices answer in plain JSON.

use crate::crypto::{TuyaCipher, sign};
use crate::error::{Result, TuyaError};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of the hex signature that follows the version string.
pub const SIGNATURE_LENGTH: usize = 16;

/// Data points: small integer keys (as strings) mapped to attribute values.
pub type Dps = Map<String, Value>;

/// A logical command, serialized fresh for every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandEnvelope {
    Get {
        #[serde(rename = "gwId")]
        gw_id: String,
        #[serde(rename = "devId")]
        dev_id: String,
    },
    Set {
        t: u64,
        #[serde(rename = "devId")]
        dev_id: String,
        dps: Dps,
        uid: String,
    },
}

impl CommandEnvelope {
    pub fn get(id: &str) -> Self {
        CommandEnvelope::Get {
            gw_id: id.to_string(),
            dev_id: id.to_string(),
        }
    }

    pub fn set(id: &str, dps: Dps) -> Self {
        CommandEnvelope::Set {
            t: timestamp(),
            dev_id: id.to_string(),
            dps,
            uid: String::new(),
        }
    }

    pub fn dps(&self) -> Option<&Dps> {
        match self {
            CommandEnvelope::Set { dps, .. } => Some(dps),
            CommandEnvelope::Get { .. } => None,
        }
    }
}

/// Body of a status query response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusResponse {
    pub dps: Dps,
}

/// Builds, encrypts and signs payloads for one device.
#[derive(Clone)]
pub struct PayloadCodec {
    cipher: TuyaCipher,
    key: Vec<u8>,
    version: String,
}

impl PayloadCodec {
    /// Expands the key schedule once; fails if the key is not 16 bytes.
    pub fn new(key: &[u8], version: &str) -> Result<Self> {
        Ok(Self {
            cipher: TuyaCipher::new(key)?,
            key: key.to_vec(),
            version: version.to_string(),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Serializes `command`; when `encrypt` is set the JSON is encrypted and signed.
    pub fn encode(&self, command: &CommandEnvelope, encrypt: bool) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(command)?;
        debug!("Request JSON: {}", String::from_utf8_lossy(&json));

        if !encrypt {
            return Ok(json);
        }

        let b64 = self.cipher.encrypt(&json, true);
        let signature = self.sign(&b64);

        let mut payload =
            Vec::with_capacity(self.version.len() + SIGNATURE_LENGTH + b64.len());
        payload.extend_from_slice(self.version.as_bytes());
        payload.extend_from_slice(signature.as_bytes());
        payload.extend_from_slice(&b64);
        debug!("Signed payload: {}", String::from_utf8_lossy(&payload));
        Ok(payload)
    }

    /// Signature over a Base64 ciphertext with this device's version and key.
    pub fn sign(&self, b64_data: &[u8]) -> String {
        sign(b64_data, &self.version, &self.key)
    }

    /// Parses a plaintext JSON response into `T`; invalid JSON or a missing
    /// required field is a parse error.
    pub fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        serde_json::from_slice(data).map_err(TuyaError::from)
    }

    /// Inverse of an encrypted `encode`: checks the version and signature,
    /// decrypts and parses the JSON body. This is what a device does with a
    /// control payload.
    pub fn open(&self, payload: &[u8]) -> Result<Value> {
        let header_len = self.version.len() + SIGNATURE_LENGTH;
        if payload.len() < header_len {
            return Err(TuyaError::Parse("payload shorter than signed header".into()));
        }

        let (version, rest) = payload.split_at(self.version.len());
        if version != self.version.as_bytes() {
            return Err(TuyaError::Parse(format!(
                "unexpected version header {:?}",
                String::from_utf8_lossy(version)
            )));
        }

        let (signature, b64) = rest.split_at(SIGNATURE_LENGTH);
        if signature != self.sign(b64).as_bytes() {
            return Err(TuyaError::Parse("signature mismatch".into()));
        }

        let json = self.cipher.decrypt(b64, true)?;
        self.decode(&json)
    }
}

fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
