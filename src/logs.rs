//! Remote log retrieval for `log_regex` confirmation.
//!
//! Only consulted when a pattern's `log_regex` misses the node's inline
//! excerpt and the node names a `log_url`. CI systems commonly store logs as
//! gzip blobs, so fetched bodies are sniffed for the gzip magic and
//! decompressed before matching. Fetch failures are non-fatal for the
//! invocation; the caller treats them as a non-match for that pattern.

use std::io::Read;

use flate2::read::GzDecoder;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Fetches a log as text, transparently decompressing gzip bodies.
/// Returns `None` for an empty body.
pub async fn fetch_log(url: &str) -> Result<Option<String>, reqwest::Error> {
    let response = reqwest::get(url).await?;
    let body = response.error_for_status()?.bytes().await?;
    Ok(decode_body(&body))
}

/// Gzip-sniffs a fetched body: a gzip blob is decompressed, anything else is
/// taken as text. A corrupt gzip stream falls back to the raw bytes so a
/// plain log that happens to start with the magic still matches.
fn decode_body(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    if body.starts_with(&GZIP_MAGIC) {
        let mut text = String::new();
        if GzDecoder::new(body).read_to_string(&mut text).is_ok() {
            return Some(text);
        }
    }
    Some(String::from_utf8_lossy(body).into_owned())
}
