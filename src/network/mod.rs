//! Read-only sharing of a task list with a peer over TCP.
//!
//! A peer connects, sends `GET_TODOS\n`, and receives one length-prefixed
//! frame holding the server's task list as JSON, or a short plaintext error.
//! The server closes the connection after every response.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::fetch_tasks;
pub use protocol::{resolve_addr, DEFAULT_PORT, REQUEST_TOKEN};
pub use server::ShareServer;

use std::time::Duration;

/// Knobs shared by the server and the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareOptions {
    /// Upper bound on connecting and on the whole request/response exchange.
    pub io_timeout: Duration,
}

impl Default for ShareOptions {
    fn default() -> Self {
        ShareOptions {
            io_timeout: Duration::from_secs(10),
        }
    }
}
