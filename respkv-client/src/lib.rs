//! # RespKV Sync Client
//!
//! Purpose: Provide a lightweight, synchronous RESP2 key/value client with a
//! bounded connection pool shared by many threads.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Reuse TCP connections; evict any connection
//!    whose last operation failed.
//! 2. **Typed Errors**: Transport, protocol, pool and input failures are
//!    distinct `ClientError` variants.
//! 3. **Minimal Allocation**: Reuse buffers for RESP framing and parsing.
//! 4. **Injected Diagnostics**: Every operation reports to a sink handed in at
//!    construction.
//!
//! ```no_run
//! use respkv_client::KVClient;
//!
//! let client = KVClient::connect("127.0.0.1:6379")?;
//! client.lists().push("jobs", &["a", "b"])?;
//! let next = client.lists().pop("jobs")?;
//! # Ok::<(), respkv_client::ClientError>(())
//! ```

mod client;
mod command;
mod config;
mod connection;
mod diagnostics;
mod error;
mod hash;
mod list;
mod pool;
mod resp;
mod strings;

pub use client::KVClient;
pub use command::Command;
pub use config::ClientConfig;
pub use connection::Connection;
pub use diagnostics::{
    Diagnostics, DiagnosticsRecorder, DiagnosticsSnapshot, LatencyHistogram, LatencySnapshot,
    TracingDiagnostics, CATEGORY, SLOW_OPERATION_CODE,
};
pub use error::{ClientError, ClientResult, ErrorKind};
pub use hash::Hashes;
pub use list::Lists;
pub use pool::{ConnectionPool, ItemState, PoolConfig, PoolStats, PooledConnection};
pub use resp::{decode_utf8, encode_command, encode_reply, read_reply, read_value, RespValue};
pub use strings::{ClientTtl, Strings};
