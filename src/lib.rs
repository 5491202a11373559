//! # todust
//!
//! A tiny terminal todo list. Tasks live in a single JSON file; any
//! instance can share its list read-only with a friend on the local network.
//!
//! ```bash
//! todust add buy milk
//! todust list
//! todust done 1
//! todust friend serve 0.0.0.0        # share on port 8088
//! todust friend connect 192.168.1.20 # view a friend's list
//! ```
//!
//! The task file is `~/.todust/tasks.json` unless overridden by `--db`,
//! the `TODUST_DB` environment variable, or `todust config set-db`.

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod render;
pub mod storage;

pub use error::{Result, TodoError};
pub use models::Task;
pub use storage::TaskStore;
