//! Stage 5: turn the final data into entry content

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::entry::{AbstractEntry, BoundContent, Data, TransportEncoding};
use crate::error::{Error, Result};

use super::BindContext;

/// Encode `data` for transport.
///
/// Base64 transport accepts any bytes. Text transport decodes the bytes
/// with the configured source encoding; text produced by a template passes
/// through unchanged. Zero-length content is reported as
/// [`BoundContent::Empty`].
pub fn execute(ctx: &BindContext<'_, '_>, entry: &AbstractEntry, data: Data) -> Result<(BoundContent, TransportEncoding)> {
    if entry.is_base64() {
        let content = if data.is_empty() {
            BoundContent::Empty
        } else {
            BoundContent::Text(STANDARD.encode(data.as_bytes()))
        };
        return Ok((content, TransportEncoding::Base64));
    }

    let text = match data {
        Data::Text(text) => text,
        Data::Bytes(bytes) => ctx
            .options
            .encoding
            .decode(&bytes)
            .map_err(|(kind, message)| Error::EncodingFailure {
                entry: entry.name.clone(),
                kind,
                message,
            })?,
    };
    let content = if text.is_empty() {
        BoundContent::Empty
    } else {
        BoundContent::Text(text)
    };
    Ok((content, TransportEncoding::Text))
}
