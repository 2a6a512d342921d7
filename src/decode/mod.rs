//! Response body decoding
//!
//! Helpers that consume a response and read its body. They do not look at the
//! status code; a 404 with a JSON error body decodes just like a 200.

use crate::error::{Error, Result};
use bytes::{Bytes, BytesMut};
use reqwest::Response;
use serde::de::DeserializeOwned;

/// Read the whole body
pub async fn decode_bytes(response: Response) -> Result<Bytes> {
    response
        .bytes()
        .await
        .map_err(|e| Error::decode(format!("error reading response body: {e}")))
}

/// Read at most `limit` bytes of the body
///
/// Fails once the body grows past the limit instead of truncating it.
pub async fn decode_bytes_limited(mut response: Response, limit: usize) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| Error::decode(format!("error reading response body: {e}")))?
    {
        if buf.len() + chunk.len() > limit {
            return Err(Error::decode(format!(
                "response body exceeds {limit} bytes"
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// Read the body and deserialize it as JSON
pub async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = decode_bytes(response).await?;
    serde_json::from_slice(&body)
        .map_err(|e| Error::decode(format!("error deserializing response body: {e}")))
}

#[cfg(test)]
mod tests;
