// Content type sniffing for uploaded blobs
use crate::storage::{StorageError, StorageResult};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Number of leading bytes inspected when sniffing
pub const SNIFF_LIMIT: usize = 3072;

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Detect the content type of an in-memory blob
///
/// Empty input is `text/plain`. Known binary signatures win over the text
/// check; anything else that is valid UTF-8 is UTF-8 text.
///
/// Only magic-number formats get a specific type. Structured text such as
/// JSON, CSV or HTML is deliberately reported as plain UTF-8 text.
pub fn detect(data: &[u8]) -> String {
    if data.is_empty() {
        return TEXT_PLAIN.to_string();
    }

    let head = &data[..data.len().min(SNIFF_LIMIT)];

    if let Some(kind) = infer::get(head) {
        return kind.mime_type().to_string();
    }

    if is_utf8_prefix(head, head.len() < data.len()) {
        TEXT_PLAIN_UTF8.to_string()
    } else {
        OCTET_STREAM.to_string()
    }
}

/// Read `reader` to the end and detect its content type
pub async fn detect_reader<R>(reader: &mut R) -> StorageResult<String>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .await
        .map_err(|e| StorageError::Validation(format!("Failed to read input for MIME detection: {}", e)))?;

    Ok(detect(&buf))
}

// A truncated sample may end inside a multi-byte character.
fn is_utf8_prefix(head: &[u8], truncated: bool) -> bool {
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => truncated && e.error_len().is_none(),
    }
}
