//! Pictures and attachments kept in a content-addressed blob store.
//!
//! Blobs carry their own mime type: `[len: u8][mime: utf-8][raw bytes]`.
//! Uploaders and downloaders must agree on this framing.

use crate::Error;
use std::future::Future;
use tracing::debug;

/// Longest mime type the one-byte length prefix can describe.
pub const MAX_MIME_LEN: usize = u8::MAX as usize;

/// Content-addressed storage for media.
pub trait BlobStore: Sync {
    /// Stores `bytes`, returning their content hash.
    fn put(&self, bytes: Vec<u8>) -> impl Future<Output = Result<String, Error>> + Send;

    /// Retrieves the bytes stored under `hash`.
    fn get(&self, hash: &str) -> impl Future<Output = Result<Vec<u8>, Error>> + Send;
}

/// A media file together with its mime type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaPayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaPayload {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Result<Self, Error> {
        let mime_type = mime_type.into();
        if mime_type.is_empty() || mime_type.len() > MAX_MIME_LEN {
            return Err(Error::invalid(format!(
                "Mime type must be 1..={MAX_MIME_LEN} bytes, got {}",
                mime_type.len()
            )));
        }

        Ok(Self { mime_type, bytes })
    }

    /// Frames the payload for upload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mime_len = u8::try_from(self.mime_type.len())
            .map_err(|_| Error::invalid("Mime type is too long"))?;

        let mut framed = Vec::with_capacity(1 + self.mime_type.len() + self.bytes.len());
        framed.push(mime_len);
        framed.extend_from_slice(self.mime_type.as_bytes());
        framed.extend_from_slice(&self.bytes);
        Ok(framed)
    }

    /// Parses a downloaded blob.
    pub fn from_bytes(framed: &[u8]) -> Result<Self, Error> {
        let (len, rest) = framed
            .split_first()
            .ok_or_else(|| Error::Decode("Empty media blob".to_string()))?;
        let len = usize::from(*len);

        if rest.len() < len {
            return Err(Error::Decode(format!(
                "Media blob declares a {len} byte mime type but has {} bytes",
                rest.len()
            )));
        }

        let mime_type = std::str::from_utf8(&rest[..len])
            .map_err(|err| Error::Decode(format!("Mime type is not UTF-8: {err}")))?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            bytes: rest[len..].to_vec(),
        })
    }
}

/// Uploads a media file, returning the hash to reference it by.
pub async fn upload_media<B: BlobStore>(store: &B, payload: &MediaPayload) -> Result<String, Error> {
    let framed = payload.to_bytes()?;
    let size = framed.len();
    let hash = store.put(framed).await?;
    debug!(%hash, size, mime = %payload.mime_type, "Uploaded media");
    Ok(hash)
}

/// Downloads and unframes the media file stored under `hash`.
pub async fn download_media<B: BlobStore>(store: &B, hash: &str) -> Result<MediaPayload, Error> {
    let framed = store.get(hash).await?;
    MediaPayload::from_bytes(&framed)
}
