//! Tuya protocol 3.1 encryption and signing.
//! AES-128-ECB with PKCS#7 padding, Base64 transport encoding and the truncated
//! MD5 signature that authenticates control payloads.

use crate::error::{Result, TuyaError};
use aes::Aes128;
use base64::{Engine as _, engine::general_purpose};
use cipher::block_padding::Pkcs7;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit};
use ecb::{Decryptor, Encryptor};
use md5::{Digest, Md5};

/// AES block size in bytes.
pub const BLOCK_LENGTH: usize = 16;

/// Length of the local key accepted by protocol 3.1 devices.
pub const KEY_LENGTH: usize = 16;

/// TuyaCipher holds the expanded AES-128 key schedule for one device.
#[derive(Clone)]
pub struct TuyaCipher {
    encryptor: Encryptor<Aes128>,
    decryptor: Decryptor<Aes128>,
}

impl TuyaCipher {
    /// Create a new TuyaCipher with a 16-byte key.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LENGTH {
            return Err(TuyaError::Argument(format!(
                "local key must be {} bytes, got {}",
                KEY_LENGTH,
                key.len()
            )));
        }
        let key = GenericArray::from_slice(key);
        Ok(Self {
            encryptor: Encryptor::<Aes128>::new(key),
            decryptor: Decryptor::<Aes128>::new(key),
        })
    }

    /// Pad with PKCS#7 and encrypt block by block.
    /// * `use_base64`: If true, encode the result in Base64.
    pub fn encrypt(&self, data: &[u8], use_base64: bool) -> Vec<u8> {
        let mut ciphertext = pkcs7_pad(data);
        let mut encryptor = self.encryptor.clone();
        for chunk in ciphertext.chunks_mut(BLOCK_LENGTH) {
            encryptor.encrypt_block_mut(GenericArray::from_mut_slice(chunk));
        }

        if use_base64 {
            general_purpose::STANDARD.encode(&ciphertext).into_bytes()
        } else {
            ciphertext
        }
    }

    /// Decrypt data and strip PKCS#7 padding.
    /// * `use_base64`: If true, the input data is expected to be Base64 encoded.
    pub fn decrypt(&self, data: &[u8], use_base64: bool) -> Result<Vec<u8>> {
        let mut buf = if use_base64 {
            general_purpose::STANDARD
                .decode(data)
                .map_err(|e| TuyaError::Parse(format!("invalid base64: {}", e)))?
        } else {
            data.to_vec()
        };

        if buf.is_empty() || !buf.len().is_multiple_of(BLOCK_LENGTH) {
            return Err(TuyaError::Parse(format!(
                "ciphertext length {} is not a positive multiple of {}",
                buf.len(),
                BLOCK_LENGTH
            )));
        }

        let plain_len = self
            .decryptor
            .clone()
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .map_err(|_| TuyaError::Parse("invalid padding".into()))?
            .len();
        buf.truncate(plain_len);
        Ok(buf)
    }
}

/// Appends `n` bytes of value `n`, where `n` is 1..=16. Input that is already
/// block aligned gets a whole block of padding.
pub fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let padding = BLOCK_LENGTH - data.len() % BLOCK_LENGTH;
    let mut padded = Vec::with_capacity(data.len() + padding);
    padded.extend_from_slice(data);
    padded.resize(data.len() + padding, padding as u8);
    padded
}

/// Signature over a Base64 ciphertext: hex MD5 of
/// `data=<b64>||lpv=<version>||<key>`, characters 8 through 23.
pub fn sign(b64_data: &[u8], version: &str, key: &[u8]) -> String {
    let mut md5 = Md5::new();
    md5.update(b"data=");
    md5.update(b64_data);
    md5.update(b"||lpv=");
    md5.update(version.as_bytes());
    md5.update(b"||");
    md5.update(key);
    let digest = hex::encode(md5.finalize());
    digest[8..24].to_string()
}
