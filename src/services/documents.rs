use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::Engine;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use uuid::Uuid;

const NONCE_LEN: usize = 12;
const MAX_NAME_LEN: usize = 100;

/// Encrypted résumé storage on Cloudflare R2 (S3-compatible).
///
/// Documents are sealed with AES-256-GCM before upload; the returned object
/// key is the opaque `document_location` recorded by the pipeline.
pub struct DocumentVault {
    bucket: Box<Bucket>,
    cipher: Aes256Gcm,
}

/// R2 connection and encryption settings.
pub struct VaultConfig<'a> {
    pub bucket: &'a str,
    pub endpoint: &'a str,
    pub access_key: &'a str,
    pub secret_key: &'a str,
    /// Base64-encoded 32-byte key.
    pub encryption_key: &'a str,
}

impl DocumentVault {
    pub fn new(config: &VaultConfig<'_>) -> Result<Self, DocumentError> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: config.endpoint.to_string(),
        };

        let credentials = Credentials::new(
            Some(config.access_key),
            Some(config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| DocumentError::Config(e.to_string()))?;

        let bucket = Bucket::new(config.bucket, region, credentials)
            .map_err(|e| DocumentError::Config(e.to_string()))?;

        Ok(Self {
            bucket,
            cipher: cipher_from_key(config.encryption_key)?,
        })
    }

    /// Encrypt and upload a résumé, returning its location.
    pub async fn put(
        &self,
        candidate_id: Uuid,
        file_name: &str,
        document: &[u8],
    ) -> Result<String, DocumentError> {
        let location = document_key(candidate_id, file_name);
        let sealed = seal(&self.cipher, document)?;

        self.bucket
            .put_object_with_content_type(&location, &sealed, "application/octet-stream")
            .await?;

        tracing::debug!(%candidate_id, location = %location, bytes = document.len(), "Stored résumé");
        Ok(location)
    }

    /// Download and decrypt a résumé.
    pub async fn get(&self, location: &str) -> Result<Vec<u8>, DocumentError> {
        let response = self.bucket.get_object(location).await?;
        open(&self.cipher, &response.to_vec())
    }

    /// Remove a stored résumé.
    pub async fn delete(&self, location: &str) -> Result<(), DocumentError> {
        self.bucket.delete_object(location).await?;
        Ok(())
    }
}

fn cipher_from_key(key_base64: &str) -> Result<Aes256Gcm, DocumentError> {
    let key_bytes = base64::engine::general_purpose::STANDARD
        .decode(key_base64)
        .map_err(|_| DocumentError::InvalidKey)?;

    if key_bytes.len() != 32 {
        return Err(DocumentError::InvalidKey);
    }

    Aes256Gcm::new_from_slice(&key_bytes).map_err(|_| DocumentError::InvalidKey)
}

/// Nonce (12 bytes) prepended to the ciphertext.
fn seal(cipher: &Aes256Gcm, plaintext: &[u8]) -> Result<Vec<u8>, DocumentError> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| DocumentError::EncryptFailed)?;

    let mut output = nonce.to_vec();
    output.extend(ciphertext);
    Ok(output)
}

fn open(cipher: &Aes256Gcm, data: &[u8]) -> Result<Vec<u8>, DocumentError> {
    if data.len() < NONCE_LEN {
        return Err(DocumentError::DecryptFailed);
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| DocumentError::DecryptFailed)
}

/// Object key for an upload: `resumes/<candidate>/<uuid>-<name>.enc`.
pub fn document_key(candidate_id: Uuid, file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    let safe = safe.trim_start_matches('.');
    let safe = if safe.is_empty() { "resume" } else { safe };

    format!("resumes/{candidate_id}/{}-{safe}.enc", Uuid::new_v4())
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("Document storage configuration error: {0}")]
    Config(String),

    #[error("Invalid encryption key (must be 32 bytes, base64-encoded)")]
    InvalidKey,

    #[error("Encryption failed")]
    EncryptFailed,

    #[error("Decryption failed")]
    DecryptFailed,
}
