//! # Synchronous Client API
//!
//! Purpose: Expose a compact, blocking API for issuing RESP2 commands to the
//! store, hiding pooling and protocol details.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `KVClient` hides pooling and protocol details; the
//!    list, hash and string facades borrow it.
//! 2. **One Template**: Every operation runs through `execute`, which times
//!    it, evicts the connection on fatal errors and reports diagnostics.
//! 3. **Fail Fast**: Input errors are raised before a connection is borrowed.
//! 4. **No Retries**: Retry policy belongs to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::command::Command;
use crate::config::ClientConfig;
use crate::diagnostics::{Diagnostics, TracingDiagnostics, CATEGORY, SLOW_OPERATION_CODE};
use crate::error::{ClientError, ClientResult};
use crate::hash::Hashes;
use crate::list::Lists;
use crate::pool::{ConnectionPool, PoolStats, PooledConnection};
use crate::strings::Strings;

/// Synchronous client with connection pooling.
///
/// Cheap to share between threads behind an `Arc`; every call borrows its own
/// connection.
pub struct KVClient {
    pool: ConnectionPool,
    diagnostics: Arc<dyn Diagnostics>,
    slow_operation_threshold: Duration,
}

/// A leased connection plus the item counts reported for the operation.
pub(crate) struct Operation<'a> {
    pub conn: &'a mut PooledConnection,
    pub items_read: usize,
    pub items_written: usize,
}

impl KVClient {
    /// Creates a client with default configuration.
    pub fn connect(addr: impl Into<String>) -> ClientResult<Self> {
        let config = ClientConfig {
            addr: addr.into(),
            ..ClientConfig::default()
        };
        Self::with_config(config)
    }

    /// Creates a client reporting through `tracing`.
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        Self::with_diagnostics(config, Arc::new(TracingDiagnostics))
    }

    /// Creates a client reporting to the provided diagnostics sink.
    pub fn with_diagnostics(config: ClientConfig, diagnostics: Arc<dyn Diagnostics>) -> ClientResult<Self> {
        config.validate()?;
        let pool = ConnectionPool::new(config.pool_config())?;
        if config.min_idle > 0 {
            // The store may be down at startup; borrowers dial lazily instead.
            if let Err(err) = pool.prewarm(config.min_idle) {
                warn!(addr = %config.addr, error = %err, "failed to prewarm connection pool");
            }
        }
        Ok(KVClient {
            pool,
            diagnostics,
            slow_operation_threshold: config.slow_operation_threshold,
        })
    }

    pub fn lists(&self) -> Lists<'_> {
        Lists::new(self)
    }

    pub fn hashes(&self) -> Hashes<'_> {
        Hashes::new(self)
    }

    pub fn strings(&self) -> Strings<'_> {
        Strings::new(self)
    }

    /// Pings the store. Returns the status text, normally `PONG`.
    pub fn ping(&self) -> ClientResult<String> {
        self.execute("ping", "", |op| {
            op.conn.exec(Command::Ping, &[])?.into_simple()
        })
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Closes idle connections; later calls fail with `PoolClosed`.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    /// Runs one operation on a leased connection.
    ///
    /// The lease is returned (or evicted on a fatal error) before diagnostics
    /// are reported, on every path.
    pub(crate) fn execute<T, F>(&self, operation: &'static str, key: &str, f: F) -> ClientResult<T>
    where
        F: FnOnce(&mut Operation<'_>) -> ClientResult<T>,
    {
        let start = Instant::now();
        let (result, items_read, items_written) = match self.pool.acquire() {
            Ok(mut lease) => {
                let mut op = Operation {
                    conn: &mut lease,
                    items_read: 0,
                    items_written: 0,
                };
                let result = f(&mut op);
                let counts = (op.items_read, op.items_written);
                if let Err(err) = &result {
                    if err.is_connection_fatal() {
                        lease.mark_broken();
                    }
                }
                (result, counts.0, counts.1)
            }
            Err(err) => (Err(err), 0, 0),
        };
        let elapsed = start.elapsed();

        self.diagnostics.track(CATEGORY, elapsed, items_read, items_written);
        match &result {
            Ok(_) => debug!(
                operation,
                key,
                items_read,
                items_written,
                elapsed_us = elapsed.as_micros() as u64,
                "store operation"
            ),
            Err(err) => warn!(
                operation,
                key,
                error = %err,
                elapsed_us = elapsed.as_micros() as u64,
                "store operation failed"
            ),
        }
        if elapsed > self.slow_operation_threshold {
            self.diagnostics.warn_slow(
                SLOW_OPERATION_CODE,
                operation,
                elapsed,
                self.slow_operation_threshold,
            );
        }
        result
    }
}

pub(crate) fn validate_key(key: &str) -> ClientResult<()> {
    if key.is_empty() {
        return Err(ClientError::InvalidInput("key must not be empty"));
    }
    Ok(())
}
