//! Wire framing: `<uint32 little-endian byte length><UTF-8 JSON body>`.

use anyhow::{bail, Context, Result};
use std::io::{Read, Write};

/// Messages larger than this are a protocol error, not merely rejected.
pub const MAX_MESSAGE_BYTES: u32 = 1024 * 1024;

/// Reads one length-prefixed JSON message and deserializes it as `T`.
/// Returns `Ok(None)` on clean EOF before any bytes of a new message arrive.
pub fn read_message<T, R>(reader: &mut R) -> Result<Option<T>>
where
    T: serde::de::DeserializeOwned,
    R: Read,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e).context("read message length prefix"),
    }
    let len = u32::from_le_bytes(len_buf);
    if len > MAX_MESSAGE_BYTES {
        bail!(
            "message length {} exceeds {} byte cap",
            len,
            MAX_MESSAGE_BYTES
        );
    }
    let mut body = vec![0u8; len as usize];
    reader
        .read_exact(&mut body)
        .context("read message body")?;
    let value = serde_json::from_slice(&body).context("decode message body as JSON")?;
    Ok(Some(value))
}

/// Serializes `value` as JSON and writes it with its little-endian length prefix.
pub fn write_message<T, W>(writer: &mut W, value: &T) -> Result<()>
where
    T: serde::Serialize,
    W: Write,
{
    let body = serde_json::to_vec(value).context("encode message body as JSON")?;
    if body.len() as u64 > MAX_MESSAGE_BYTES as u64 {
        bail!(
            "encoded message is {} bytes, exceeds {} byte cap",
            body.len(),
            MAX_MESSAGE_BYTES
        );
    }
    writer
        .write_all(&(body.len() as u32).to_le_bytes())
        .context("write message length prefix")?;
    writer.write_all(&body).context("write message body")?;
    writer.flush().context("flush message")?;
    Ok(())
}
