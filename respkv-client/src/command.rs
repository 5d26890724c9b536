//! Command names sent by the client.

/// Every command the client knows how to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Get,
    Set,
    Del,
    IncrBy,
    MGet,
    MSet,
    PExpire,
    PTtl,
    Exists,
    Ping,
    LPop,
    RPush,
    LRange,
    HGet,
    HGetAll,
    HSet,
    HMSet,
    HIncrBy,
    HDel,
    Multi,
    Exec,
}

impl Command {
    /// Wire name of the command.
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Command::Get => b"GET",
            Command::Set => b"SET",
            Command::Del => b"DEL",
            Command::IncrBy => b"INCRBY",
            Command::MGet => b"MGET",
            Command::MSet => b"MSET",
            Command::PExpire => b"PEXPIRE",
            Command::PTtl => b"PTTL",
            Command::Exists => b"EXISTS",
            Command::Ping => b"PING",
            Command::LPop => b"LPOP",
            Command::RPush => b"RPUSH",
            Command::LRange => b"LRANGE",
            Command::HGet => b"HGET",
            Command::HGetAll => b"HGETALL",
            Command::HSet => b"HSET",
            Command::HMSet => b"HMSET",
            Command::HIncrBy => b"HINCRBY",
            Command::HDel => b"HDEL",
            Command::Multi => b"MULTI",
            Command::Exec => b"EXEC",
        }
    }
}
