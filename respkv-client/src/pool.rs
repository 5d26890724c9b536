//! # Connection Pool
//!
//! Purpose: Share a bounded set of TCP connections between many blocking
//! callers, evicting connections whose last operation failed.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Keep a bounded set of reusable connections.
//! 2. **Minimal Locking**: Hold the mutex only while moving idle connections;
//!    dialing happens outside the lock with the slot already reserved.
//! 3. **Bounded Waiting**: Borrowers block on a condvar up to the borrow
//!    timeout, then fail with `PoolExhausted`.
//! 4. **RAII Return**: A lease goes back to the pool (or is evicted) on drop,
//!    so every exit path returns it exactly once.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::command::Command;
use crate::connection::Connection;
use crate::error::{ClientError, ClientResult};
use crate::resp::RespValue;

/// Pool configuration for the sync client.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Maximum total connections (idle + leased).
    pub max_size: usize,
    /// Maximum wait in `acquire` before failing.
    pub borrow_timeout: Duration,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
}

/// Point-in-time view of the pool registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub leased: usize,
    pub max_size: usize,
}

struct PoolState {
    idle: VecDeque<Connection>,
    /// Idle plus leased plus slots reserved for an in-progress dial.
    total: usize,
    next_id: u64,
    closed: bool,
}

struct PoolInner {
    config: PoolConfig,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl PoolInner {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // The registry is consistent between statements, so a panic elsewhere
        // never leaves it half-updated.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release_slot(&self) {
        let mut state = self.lock();
        state.total = state.total.saturating_sub(1);
        drop(state);
        self.available.notify_one();
    }

    fn return_connection(&self, conn: Connection, item_state: ItemState) {
        let mut state = self.lock();
        if item_state == ItemState::Broken || state.closed {
            state.total = state.total.saturating_sub(1);
            drop(state);
            if item_state == ItemState::Broken {
                warn!(id = conn.id(), "evicting broken connection");
            }
            // Close the socket outside the lock.
            drop(conn);
        } else {
            state.idle.push_back(conn);
            drop(state);
        }
        self.available.notify_one();
    }
}

/// Connection pool handle.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Creates a new connection pool with the provided configuration.
    ///
    /// No connection is dialed here; see [`prewarm`](Self::prewarm).
    pub fn new(config: PoolConfig) -> ClientResult<Self> {
        if config.max_size == 0 {
            return Err(ClientError::Config("pool size must be positive".to_string()));
        }
        let state = PoolState {
            idle: VecDeque::with_capacity(config.max_size),
            total: 0,
            next_id: 1,
            closed: false,
        };
        Ok(ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(state),
                available: Condvar::new(),
            }),
        })
    }

    /// Acquires a connection, waiting up to the borrow timeout.
    pub fn acquire(&self) -> ClientResult<PooledConnection> {
        let start = Instant::now();
        let deadline = start + self.inner.config.borrow_timeout;
        let mut state = self.inner.lock();

        loop {
            if state.closed {
                return Err(ClientError::PoolClosed);
            }
            if let Some(conn) = state.idle.pop_front() {
                return Ok(PooledConnection::new(self.inner.clone(), conn));
            }
            if state.total < self.inner.config.max_size {
                state.total += 1;
                let id = state.next_id;
                state.next_id += 1;
                drop(state);
                return self.dial(id);
            }

            let now = Instant::now();
            if now >= deadline {
                let waited = now - start;
                warn!(max_size = self.inner.config.max_size, ?waited, "connection pool exhausted");
                return Err(ClientError::PoolExhausted { waited });
            }
            let (guard, _) = self
                .inner
                .available
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    /// Dials up to `count` idle connections ahead of demand.
    ///
    /// Returns the number of connections created.
    pub fn prewarm(&self, count: usize) -> ClientResult<usize> {
        let mut created = 0;
        while created < count {
            let id = {
                let mut state = self.inner.lock();
                if state.closed || state.total >= self.inner.config.max_size {
                    break;
                }
                state.total += 1;
                let id = state.next_id;
                state.next_id += 1;
                id
            };
            match Connection::connect(&self.inner.config, id) {
                Ok(conn) => {
                    // A fresh connection goes through the same return path as a healthy lease.
                    self.inner.return_connection(conn, ItemState::Leased);
                    created += 1;
                }
                Err(err) => {
                    self.inner.release_slot();
                    return Err(err);
                }
            }
        }
        debug!(created, "pool prewarmed");
        Ok(created)
    }

    /// Closes all idle connections and refuses further borrows.
    ///
    /// Leased connections are closed when their lease is dropped.
    pub fn shutdown(&self) {
        let drained: Vec<Connection> = {
            let mut state = self.inner.lock();
            state.closed = true;
            let drained: Vec<Connection> = state.idle.drain(..).collect();
            state.total = state.total.saturating_sub(drained.len());
            drained
        };
        self.inner.available.notify_all();
        debug!(closed = drained.len(), "pool shut down");
        drop(drained);
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.inner.lock();
        PoolStats {
            idle: state.idle.len(),
            leased: state.total - state.idle.len(),
            max_size: self.inner.config.max_size,
        }
    }

    fn dial(&self, id: u64) -> ClientResult<PooledConnection> {
        match Connection::connect(&self.inner.config, id) {
            Ok(conn) => Ok(PooledConnection::new(self.inner.clone(), conn)),
            Err(err) => {
                // Give the slot back so a later acquire retries the dial.
                self.inner.release_slot();
                Err(err)
            }
        }
    }
}

/// Health of a leased pool item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Leased,
    Broken,
}

/// RAII lease returning a connection to the pool on drop.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
    state: ItemState,
}

impl PooledConnection {
    fn new(pool: Arc<PoolInner>, conn: Connection) -> Self {
        PooledConnection {
            pool,
            conn: Some(conn),
            state: ItemState::Leased,
        }
    }

    /// Flags the connection so the pool closes it instead of reusing it.
    pub fn mark_broken(&mut self) {
        self.state = ItemState::Broken;
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    /// Sends one command and reads its reply, marking the lease broken when
    /// the connection can no longer be trusted.
    pub fn exec(&mut self, command: Command, args: &[&[u8]]) -> ClientResult<RespValue> {
        let result = self.send(command, args).and_then(|_| self.read_value());
        if let Err(err) = &result {
            if err.is_connection_fatal() {
                self.mark_broken();
            }
        }
        result
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.return_connection(conn, self.state);
        }
    }
}
