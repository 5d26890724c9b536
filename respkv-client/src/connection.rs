//! # Connection
//!
//! Purpose: Own one TCP socket and expose typed, blocking RESP primitives on
//! top of it.
//!
//! ## Design Principles
//! 1. **Single Owner**: A connection is used by exactly one lease at a time.
//! 2. **Buffer Reuse**: Line and write buffers live as long as the socket.
//! 3. **No Recovery**: Any failure is returned as-is; the lease holder decides
//!    to evict the connection.

use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::command::Command;
use crate::error::{ClientError, ClientResult};
use crate::pool::PoolConfig;
use crate::resp::{encode_command, read_value, RespValue};

/// Single TCP connection with reusable buffers.
pub struct Connection {
    id: u64,
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
    commands_written: u64,
}

impl Connection {
    /// Dials the configured address and applies socket timeouts.
    pub(crate) fn connect(config: &PoolConfig, id: u64) -> ClientResult<Self> {
        let stream = connect_stream(&config.addr, config.connect_timeout)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;
        debug!(id, addr = %config.addr, "connection established");

        Ok(Connection {
            id,
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: Vec::with_capacity(256),
            commands_written: 0,
        })
    }

    /// Pool-unique identifier of this connection.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of command frames written over this connection.
    pub fn commands_written(&self) -> u64 {
        self.commands_written
    }

    /// Sets both read and write timeouts on the socket.
    pub fn set_timeout(&mut self, timeout: Duration) -> ClientResult<()> {
        let stream = self.reader.get_ref();
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(())
    }

    /// Buffers one command frame; nothing is sent until [`flush`](Self::flush).
    pub fn write_command(&mut self, command: Command, args: &[&[u8]]) {
        encode_command(command, args, &mut self.write_buf);
        self.commands_written += 1;
    }

    /// Sends all buffered frames.
    pub fn flush(&mut self) -> ClientResult<()> {
        if self.write_buf.is_empty() {
            return Ok(());
        }
        let stream = self.reader.get_mut();
        let result = stream.write_all(&self.write_buf).and_then(|_| stream.flush());
        self.write_buf.clear();
        result?;
        Ok(())
    }

    /// Writes and flushes a single command.
    pub fn send(&mut self, command: Command, args: &[&[u8]]) -> ClientResult<()> {
        self.write_command(command, args);
        self.flush()
    }

    pub fn read_value(&mut self) -> ClientResult<RespValue> {
        read_value(&mut self.reader, &mut self.line_buf)
    }

    pub fn read_integer(&mut self) -> ClientResult<i64> {
        self.read_value()?.into_integer()
    }

    pub fn read_bulk(&mut self) -> ClientResult<Option<Vec<u8>>> {
        self.read_value()?.into_bulk()
    }

    pub fn read_simple(&mut self) -> ClientResult<String> {
        self.read_value()?.into_simple()
    }

    /// Reads an array reply; a nil array reads as empty.
    pub fn read_array(&mut self) -> ClientResult<Vec<RespValue>> {
        Ok(self.read_value()?.into_array()?.unwrap_or_default())
    }

    /// Reads and discards `count` replies, still raising error replies.
    pub fn read_all(&mut self, count: usize) -> ClientResult<()> {
        for _ in 0..count {
            self.read_value()?;
        }
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        debug!(id = self.id, commands = self.commands_written, "connection closed");
    }
}

fn connect_stream(addr: &str, timeout: Option<Duration>) -> ClientResult<TcpStream> {
    let addrs: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|_| ClientError::InvalidAddress(addr.to_string()))?
        .collect();
    if addrs.is_empty() {
        return Err(ClientError::InvalidAddress(addr.to_string()));
    }

    let mut last_err = None;
    for addr in addrs {
        let result = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match result {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err
        .map(ClientError::Io)
        .unwrap_or_else(|| ClientError::InvalidAddress(addr.to_string())))
}
