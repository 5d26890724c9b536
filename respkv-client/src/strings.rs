//! String commands and key-level commands (expiration, existence, delete).

use std::time::Duration;

use crate::client::{validate_key, KVClient};
use crate::command::Command;
use crate::error::{ClientError, ClientResult};
use crate::resp::{decode_utf8, RespValue};

/// TTL state returned by the store, mirroring Redis semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientTtl {
    /// Key is missing or already expired.
    Missing,
    /// Key exists without expiration.
    NoExpiry,
    /// Key expires after the provided duration.
    ExpiresIn(Duration),
}

/// String operations, borrowed from [`KVClient::strings`].
pub struct Strings<'a> {
    client: &'a KVClient,
}

impl<'a> Strings<'a> {
    pub(crate) fn new(client: &'a KVClient) -> Self {
        Strings { client }
    }

    /// Fetches a value by key. Returns `None` when the key is missing.
    pub fn get(&self, key: &str) -> ClientResult<Option<String>> {
        validate_key(key)?;
        self.client.execute("get", key, |op| {
            op.conn.send(Command::Get, &[key.as_bytes()])?;
            let value = op.conn.read_bulk()?.map(decode_utf8).transpose()?;
            op.items_read = 1;
            Ok(value)
        })
    }

    /// Sets a value without expiration.
    pub fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        validate_key(key)?;
        self.client.execute("set", key, |op| {
            op.items_written = 1;
            op.conn.send(Command::Set, &[key.as_bytes(), value.as_bytes()])?;
            op.conn.read_simple()?;
            Ok(())
        })
    }

    /// Sets a value that expires after `ttl` (millisecond precision).
    pub fn set_with_expiration(&self, key: &str, value: &str, ttl: Duration) -> ClientResult<()> {
        validate_key(key)?;
        let millis = expiration_millis(ttl)?;
        self.client.execute("set", key, |op| {
            op.items_written = 1;
            op.conn.send(
                Command::Set,
                &[key.as_bytes(), value.as_bytes(), b"PX", millis.as_bytes()],
            )?;
            op.conn.read_simple()?;
            Ok(())
        })
    }

    /// Sets the value only when the key does not exist. Returns true when set.
    pub fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> ClientResult<bool> {
        validate_key(key)?;
        let millis = expiration_millis(ttl)?;
        self.client.execute("set", key, |op| {
            op.items_written = 1;
            op.conn.send(
                Command::Set,
                &[key.as_bytes(), value.as_bytes(), b"NX", b"PX", millis.as_bytes()],
            )?;
            match op.conn.read_value()? {
                RespValue::Simple(_) => Ok(true),
                RespValue::Bulk(None) => Ok(false),
                _ => Err(ClientError::protocol("unexpected reply to SET NX")),
            }
        })
    }

    /// Adds `increment` to an integer value. Returns the new value.
    pub fn increase_by(&self, key: &str, increment: i64) -> ClientResult<i64> {
        validate_key(key)?;
        let increment = increment.to_string();
        self.client.execute("incrby", key, |op| {
            op.items_written = 1;
            op.conn.send(Command::IncrBy, &[key.as_bytes(), increment.as_bytes()])?;
            op.conn.read_integer()
        })
    }

    /// Deletes keys. Returns how many existed.
    pub fn delete<K: AsRef<str>>(&self, keys: &[K]) -> ClientResult<i64> {
        let args = key_args(keys)?;
        self.client.execute("del", keys[0].as_ref(), |op| {
            op.conn.send(Command::Del, &args)?;
            let deleted = op.conn.read_integer()?;
            op.items_written = deleted.max(0) as usize;
            Ok(deleted)
        })
    }

    /// Fetches several keys; the result is in request order.
    pub fn multi_get<K: AsRef<str>>(&self, keys: &[K]) -> ClientResult<Vec<Option<String>>> {
        let args = key_args(keys)?;
        self.client.execute("mget", keys[0].as_ref(), |op| {
            op.conn.send(Command::MGet, &args)?;
            let items = op.conn.read_array()?;
            if items.len() != keys.len() {
                return Err(ClientError::protocol(format!(
                    "expected {} values, got {}",
                    keys.len(),
                    items.len()
                )));
            }
            op.items_read = items.len();
            items
                .into_iter()
                .map(|item| item.into_bulk()?.map(decode_utf8).transpose())
                .collect()
        })
    }

    /// Sets several keys in one command.
    pub fn multi_set<K, V>(&self, values: &[(K, V)]) -> ClientResult<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if values.is_empty() {
            return Err(ClientError::InvalidInput("values must not be empty"));
        }
        let mut args = Vec::with_capacity(values.len() * 2);
        for (key, value) in values {
            validate_key(key.as_ref())?;
            args.push(key.as_ref().as_bytes());
            args.push(value.as_ref().as_bytes());
        }
        self.client.execute("mset", values[0].0.as_ref(), |op| {
            op.items_written = values.len();
            op.conn.send(Command::MSet, &args)?;
            op.conn.read_simple()?;
            Ok(())
        })
    }

    /// Sets a time-to-live. Returns true when the key exists.
    pub fn expire(&self, key: &str, ttl: Duration) -> ClientResult<bool> {
        validate_key(key)?;
        let millis = expiration_millis(ttl)?;
        self.client.execute("pexpire", key, |op| {
            op.conn.send(Command::PExpire, &[key.as_bytes(), millis.as_bytes()])?;
            Ok(op.conn.read_integer()? == 1)
        })
    }

    /// Returns TTL status for a key.
    pub fn ttl(&self, key: &str) -> ClientResult<ClientTtl> {
        validate_key(key)?;
        self.client.execute("pttl", key, |op| {
            op.conn.send(Command::PTtl, &[key.as_bytes()])?;
            match op.conn.read_integer()? {
                -2 => Ok(ClientTtl::Missing),
                -1 => Ok(ClientTtl::NoExpiry),
                millis if millis >= 0 => Ok(ClientTtl::ExpiresIn(Duration::from_millis(millis as u64))),
                other => Err(ClientError::protocol(format!("invalid ttl {}", other))),
            }
        })
    }

    pub fn exists(&self, key: &str) -> ClientResult<bool> {
        validate_key(key)?;
        self.client.execute("exists", key, |op| {
            op.conn.send(Command::Exists, &[key.as_bytes()])?;
            op.items_read = 1;
            Ok(op.conn.read_integer()? > 0)
        })
    }
}

fn key_args<K: AsRef<str>>(keys: &[K]) -> ClientResult<Vec<&[u8]>> {
    if keys.is_empty() {
        return Err(ClientError::InvalidInput("keys must not be empty"));
    }
    keys.iter()
        .map(|key| {
            validate_key(key.as_ref())?;
            Ok(key.as_ref().as_bytes())
        })
        .collect()
}

fn expiration_millis(ttl: Duration) -> ClientResult<String> {
    let millis = ttl.as_millis();
    if millis == 0 {
        return Err(ClientError::InvalidInput("expiration must be at least one millisecond"));
    }
    Ok(millis.to_string())
}
