use std::io;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::protocol::{
    decode_tasks, read_frame, resolve_addr, DEFAULT_PORT, MAX_RESPONSE_BYTES, REQUEST_TOKEN,
};
use super::ShareOptions;
use crate::error::{Result, TodoError};
use crate::models::Task;

/// Fetches a peer's task list.
///
/// `addr` is a host (default port appended) or `host:port`. The whole
/// exchange, connect included, is bounded by `options.io_timeout`.
pub async fn fetch_tasks(addr: &str, options: ShareOptions) -> Result<Vec<Task>> {
    let target = resolve_addr(addr, DEFAULT_PORT);
    match timeout(options.io_timeout, exchange(&target)).await {
        Ok(result) => result,
        Err(_) => Err(TodoError::network(
            target,
            io::Error::new(io::ErrorKind::TimedOut, "peer did not answer in time"),
        )),
    }
}

async fn exchange(target: &str) -> Result<Vec<Task>> {
    let mut stream = TcpStream::connect(target)
        .await
        .map_err(|e| TodoError::network(target, e))?;
    debug!(peer = %target, "connected");

    stream
        .write_all(format!("{REQUEST_TOKEN}\n").as_bytes())
        .await
        .map_err(|e| TodoError::network(target, e))?;

    let payload = read_frame(&mut stream, MAX_RESPONSE_BYTES)
        .await
        .map_err(|e| match e {
            TodoError::Network { source, .. } => TodoError::network(target, source),
            other => other,
        })?;
    debug!(peer = %target, bytes = payload.len(), "received response");
    decode_tasks(&payload)
}
