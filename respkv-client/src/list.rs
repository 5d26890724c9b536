//! List commands.

use crate::client::{validate_key, KVClient};
use crate::command::Command;
use crate::error::{ClientError, ClientResult};
use crate::resp::decode_utf8;

/// List operations, borrowed from [`KVClient::lists`].
pub struct Lists<'a> {
    client: &'a KVClient,
}

impl<'a> Lists<'a> {
    pub(crate) fn new(client: &'a KVClient) -> Self {
        Lists { client }
    }

    /// Removes and returns the head of the list; `None` when absent or empty.
    pub fn pop(&self, key: &str) -> ClientResult<Option<String>> {
        validate_key(key)?;
        self.client.execute("lpop", key, |op| {
            op.conn.send(Command::LPop, &[key.as_bytes()])?;
            let value = op.conn.read_bulk()?.map(decode_utf8).transpose()?;
            op.items_read = 1;
            Ok(value)
        })
    }

    /// Appends values to the tail. Returns the new list length.
    pub fn push<V: AsRef<str>>(&self, key: &str, values: &[V]) -> ClientResult<i64> {
        validate_key(key)?;
        if values.is_empty() {
            return Err(ClientError::InvalidInput("values must not be empty"));
        }
        self.client.execute("rpush", key, |op| {
            op.items_written = values.len();
            op.conn.send(Command::RPush, &key_and_values(key, values))?;
            op.conn.read_integer()
        })
    }

    /// Returns elements between `start` and `end` inclusive; negative indices
    /// count from the tail.
    pub fn range(&self, key: &str, start: i64, end: i64) -> ClientResult<Vec<String>> {
        validate_key(key)?;
        let (start, end) = (start.to_string(), end.to_string());
        self.client.execute("lrange", key, |op| {
            op.conn.send(
                Command::LRange,
                &[key.as_bytes(), start.as_bytes(), end.as_bytes()],
            )?;
            let items = op.conn.read_array()?;
            op.items_read = items.len();
            items
                .into_iter()
                .map(|item| {
                    let data = item
                        .into_bulk()?
                        .ok_or_else(|| ClientError::protocol("nil element in list range"))?;
                    decode_utf8(data)
                })
                .collect()
        })
    }

    /// Replaces the whole list atomically.
    ///
    /// Sends `MULTI`, `DEL`, `RPUSH`, `EXEC` in one flush and consumes the four
    /// replies, so no intermediate state is visible to other clients.
    pub fn set<V: AsRef<str>>(&self, key: &str, values: &[V]) -> ClientResult<()> {
        validate_key(key)?;
        if values.is_empty() {
            return Err(ClientError::InvalidInput("values must not be empty"));
        }
        self.client.execute("list_set", key, |op| {
            op.items_written = values.len();
            op.conn.write_command(Command::Multi, &[]);
            op.conn.write_command(Command::Del, &[key.as_bytes()]);
            op.conn.write_command(Command::RPush, &key_and_values(key, values));
            op.conn.write_command(Command::Exec, &[]);
            op.conn.flush()?;
            op.conn.read_all(4)
        })
    }
}

pub(crate) fn key_and_values<'v, V: AsRef<str>>(key: &'v str, values: &'v [V]) -> Vec<&'v [u8]> {
    let mut args = Vec::with_capacity(values.len() + 1);
    args.push(key.as_bytes());
    args.extend(values.iter().map(|value| value.as_ref().as_bytes()));
    args
}
