//! Hash commands.

use std::collections::HashMap;

use crate::client::{validate_key, KVClient};
use crate::command::Command;
use crate::error::{ClientError, ClientResult};
use crate::list::key_and_values;
use crate::resp::{decode_utf8, RespValue};

/// Hash operations, borrowed from [`KVClient::hashes`].
pub struct Hashes<'a> {
    client: &'a KVClient,
}

impl<'a> Hashes<'a> {
    pub(crate) fn new(client: &'a KVClient) -> Self {
        Hashes { client }
    }

    /// Returns the field value, `None` when the key or field is absent.
    pub fn get(&self, key: &str, field: &str) -> ClientResult<Option<String>> {
        validate_key(key)?;
        self.client.execute("hget", key, |op| {
            op.conn.send(Command::HGet, &[key.as_bytes(), field.as_bytes()])?;
            let value = op.conn.read_bulk()?.map(decode_utf8).transpose()?;
            op.items_read = 1;
            Ok(value)
        })
    }

    /// Returns every field and value; an absent key yields an empty map.
    pub fn get_all(&self, key: &str) -> ClientResult<HashMap<String, String>> {
        validate_key(key)?;
        self.client.execute("hgetall", key, |op| {
            op.conn.send(Command::HGetAll, &[key.as_bytes()])?;
            let items = op.conn.read_array()?;
            if items.len() % 2 != 0 {
                return Err(ClientError::protocol(format!(
                    "unexpected length of array, length={}",
                    items.len()
                )));
            }

            let mut values = HashMap::with_capacity(items.len() / 2);
            let mut items = items.into_iter();
            while let (Some(field), Some(value)) = (items.next(), items.next()) {
                values.insert(bulk_string(field)?, bulk_string(value)?);
            }
            op.items_read = values.len();
            Ok(values)
        })
    }

    pub fn set(&self, key: &str, field: &str, value: &str) -> ClientResult<()> {
        validate_key(key)?;
        self.client.execute("hset", key, |op| {
            op.items_written = 1;
            op.conn.send(
                Command::HSet,
                &[key.as_bytes(), field.as_bytes(), value.as_bytes()],
            )?;
            op.conn.read_integer()?;
            Ok(())
        })
    }

    /// Sets several fields in one command.
    pub fn multi_set<F, V>(&self, key: &str, values: &[(F, V)]) -> ClientResult<()>
    where
        F: AsRef<str>,
        V: AsRef<str>,
    {
        validate_key(key)?;
        if values.is_empty() {
            return Err(ClientError::InvalidInput("values must not be empty"));
        }
        self.client.execute("hmset", key, |op| {
            op.items_written = values.len();
            let mut args = Vec::with_capacity(1 + values.len() * 2);
            args.push(key.as_bytes());
            for (field, value) in values {
                args.push(field.as_ref().as_bytes());
                args.push(value.as_ref().as_bytes());
            }
            op.conn.send(Command::HMSet, &args)?;
            op.conn.read_simple()?;
            Ok(())
        })
    }

    /// Adds `increment` to the field. Returns the new value.
    pub fn increase_by(&self, key: &str, field: &str, increment: i64) -> ClientResult<i64> {
        validate_key(key)?;
        let increment = increment.to_string();
        self.client.execute("hincrby", key, |op| {
            op.items_written = 1;
            op.conn.send(
                Command::HIncrBy,
                &[key.as_bytes(), field.as_bytes(), increment.as_bytes()],
            )?;
            op.conn.read_integer()
        })
    }

    /// Removes fields. Returns how many existed.
    pub fn delete<F: AsRef<str>>(&self, key: &str, fields: &[F]) -> ClientResult<i64> {
        validate_key(key)?;
        if fields.is_empty() {
            return Err(ClientError::InvalidInput("fields must not be empty"));
        }
        self.client.execute("hdel", key, |op| {
            op.conn.send(Command::HDel, &key_and_values(key, fields))?;
            let deleted = op.conn.read_integer()?;
            op.items_written = deleted.max(0) as usize;
            Ok(deleted)
        })
    }
}

fn bulk_string(value: RespValue) -> ClientResult<String> {
    let data = value
        .into_bulk()?
        .ok_or_else(|| ClientError::protocol("nil element in hash reply"))?;
    decode_utf8(data)
}
