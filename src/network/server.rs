use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use super::protocol::{
    encode_tasks, is_valid_request, read_request, write_frame, ERR_ENCODE_FAILED,
    ERR_INVALID_REQUEST, ERR_LOAD_FAILED,
};
use super::ShareOptions;
use crate::error::{Result, TodoError};
use crate::storage::TaskStore;

/// Pause after a failed accept, so a persistent error such as fd exhaustion
/// does not spin the loop.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// What a single connection ended up sending back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// The task list, with this many tasks.
    Tasks(usize),
    InvalidRequest,
    LoadFailed,
    EncodeFailed,
}

/// Serves one store's task list to any peer that asks.
pub struct ShareServer {
    listener: TcpListener,
    store: TaskStore,
    options: ShareOptions,
}

impl ShareServer {
    /// Binds the listener. Use port 0 to let the OS pick one.
    pub async fn bind(addr: &str, store: TaskStore, options: ShareOptions) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TodoError::network(addr, e))?;
        Ok(ShareServer {
            listener,
            store,
            options,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| TodoError::network("listener", e))
    }

    /// Accepts connections forever, each on its own task. Accept errors are
    /// logged and retried after `ACCEPT_BACKOFF`.
    pub async fn run(self) -> Result<()> {
        let addr = self.local_addr()?;
        info!(%addr, store = %self.store.path().display(), "share server started");
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!(error = %e, "accept failed");
                    sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            let store = self.store.clone();
            let options = self.options;
            tokio::spawn(async move {
                match timeout(options.io_timeout, handle_connection(stream, store)).await {
                    Ok(Ok(Reply::Tasks(n))) => info!(%peer, count = n, "shared tasks"),
                    Ok(Ok(reply)) => warn!(%peer, ?reply, "sent error reply"),
                    Ok(Err(e)) => error!(%peer, error = %e, "connection failed"),
                    Err(_) => warn!(%peer, "connection timed out"),
                }
            });
        }
    }
}

/// Runs one request/response exchange and closes the stream.
pub async fn handle_connection(mut stream: TcpStream, store: TaskStore) -> io::Result<Reply> {
    let request = read_request(&mut stream).await?;
    let (reply, payload) = if is_valid_request(&request) {
        respond_with_tasks(store).await
    } else {
        (Reply::InvalidRequest, ERR_INVALID_REQUEST.as_bytes().to_vec())
    };
    write_frame(&mut stream, &payload).await?;
    stream.shutdown().await?;
    Ok(reply)
}

async fn respond_with_tasks(store: TaskStore) -> (Reply, Vec<u8>) {
    let loaded = tokio::task::spawn_blocking(move || store.list()).await;
    let tasks = match loaded {
        Ok(Ok(tasks)) => tasks,
        Ok(Err(e)) => {
            error!(error = %e, "failed to load local tasks");
            return (Reply::LoadFailed, ERR_LOAD_FAILED.as_bytes().to_vec());
        }
        Err(e) => {
            error!(error = %e, "task list reader panicked");
            return (Reply::LoadFailed, ERR_LOAD_FAILED.as_bytes().to_vec());
        }
    };
    match encode_tasks(&tasks) {
        Ok(data) => (Reply::Tasks(tasks.len()), data),
        Err(e) => {
            error!(error = %e, "failed to encode tasks");
            (Reply::EncodeFailed, ERR_ENCODE_FAILED.as_bytes().to_vec())
        }
    }
}
