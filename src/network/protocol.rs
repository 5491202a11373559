use std::io;
use std::net::{IpAddr, SocketAddr};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, TodoError};
use crate::models::Task;

/// The only request the server understands.
pub const REQUEST_TOKEN: &str = "GET_TODOS";
/// Port used when the address names only a host.
pub const DEFAULT_PORT: u16 = 8088;
/// Longest request the server reads before giving up on a newline.
pub const MAX_REQUEST_BYTES: usize = 1024;
/// Largest response frame a client accepts.
pub const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

pub const ERR_INVALID_REQUEST: &str = "invalid request";
pub const ERR_LOAD_FAILED: &str = "failed to load tasks";
pub const ERR_ENCODE_FAILED: &str = "json error";

/// Turns user input into a `host:port` string.
///
/// A bare host or IP gets `port` appended; anything already carrying a port
/// is returned unchanged.
pub fn resolve_addr(input: &str, port: u16) -> String {
    let input = input.trim();
    if input.parse::<SocketAddr>().is_ok() {
        return input.to_string();
    }
    if let Ok(ip) = input.parse::<IpAddr>() {
        return SocketAddr::new(ip, port).to_string();
    }
    if let Some(inner) = input.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return format!("[{inner}]:{port}");
    }
    if input.contains(':') {
        return input.to_string();
    }
    format!("{input}:{port}")
}

/// Returns true when the raw request bytes are the share request.
pub fn is_valid_request(raw: &[u8]) -> bool {
    std::str::from_utf8(raw)
        .map(|s| s.trim() == REQUEST_TOKEN)
        .unwrap_or(false)
}

/// Reads the request line: stops at a newline, end of stream, or
/// `MAX_REQUEST_BYTES`, whichever comes first.
pub async fn read_request<R: AsyncRead + Unpin>(r: &mut R) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; MAX_REQUEST_BYTES];
    let mut len = 0;
    while len < buf.len() {
        let n = r.read(&mut buf[len..]).await?;
        if n == 0 {
            break;
        }
        len += n;
        if buf[..len].contains(&b'\n') {
            break;
        }
    }
    buf.truncate(len);
    Ok(buf)
}

/// Writes `payload` as one frame: a big-endian `u32` length, then the bytes.
pub async fn write_frame<W: AsyncWrite + Unpin>(w: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;
    w.write_all(&len.to_be_bytes()).await?;
    w.write_all(payload).await?;
    w.flush().await
}

/// Reads one frame written by [`write_frame`].
///
/// A stream that ends before the announced length, or a frame larger than
/// `max`, is a protocol error rather than a short message.
pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R, max: usize) -> Result<Vec<u8>> {
    let mut header = [0u8; 4];
    if let Err(e) = r.read_exact(&mut header).await {
        return Err(truncated_or_io(e, "response header"));
    }
    let len = u32::from_be_bytes(header) as usize;
    if len > max {
        return Err(TodoError::Protocol(format!(
            "response of {len} bytes exceeds the {max} byte limit"
        )));
    }
    let mut payload = vec![0u8; len];
    if let Err(e) = r.read_exact(&mut payload).await {
        return Err(truncated_or_io(e, "response body"));
    }
    Ok(payload)
}

fn truncated_or_io(e: io::Error, what: &str) -> TodoError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        TodoError::Protocol(format!("connection closed before the full {what} arrived"))
    } else {
        TodoError::network("peer", e)
    }
}

/// Serializes tasks exactly as the local task file does.
pub fn encode_tasks(tasks: &[Task]) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(tasks).map_err(TodoError::Encode)
}

/// Decodes a response payload. Anything that is not a task list, including
/// the server's plaintext errors, is a protocol error carrying the text.
pub fn decode_tasks(payload: &[u8]) -> Result<Vec<Task>> {
    serde_json::from_slice(payload).map_err(|e| {
        let text = String::from_utf8_lossy(payload);
        let text = text.trim();
        if text.is_empty() || text.len() > 200 {
            TodoError::Protocol(format!("malformed response: {e}"))
        } else {
            TodoError::Protocol(format!("peer replied: {text}"))
        }
    })
}
