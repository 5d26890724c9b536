#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use respkv_client::{encode_reply, read_reply, ClientConfig, KVClient, RespValue};

/// What the mock store does in response to one command.
pub enum Reply {
    Value(RespValue),
    /// Bytes written verbatim, for malformed frames.
    Raw(Vec<u8>),
    /// Sleep, then answer.
    Delay(Duration, RespValue),
    /// Drop the socket without answering.
    Close,
}

type Handler = dyn Fn(&[String]) -> Reply + Send + Sync;

/// In-process store listening on an ephemeral port.
pub struct MockServer {
    pub addr: String,
    commands: Arc<Mutex<Vec<Vec<String>>>>,
    connections: Arc<AtomicUsize>,
}

impl MockServer {
    /// Serves every command through `handler`.
    pub fn scripted<F>(handler: F) -> MockServer
    where
        F: Fn(&[String]) -> Reply + Send + Sync + 'static,
    {
        Self::spawn(Arc::new(handler))
    }

    /// Serves a small in-memory store with MULTI/EXEC support.
    pub fn store() -> MockServer {
        let data = Arc::new(Mutex::new(Store::default()));
        Self::spawn(Arc::new(move |args: &[String]| {
            Reply::Value(data.lock().unwrap().apply(args))
        }))
    }

    fn spawn(handler: Arc<Handler>) -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let (log, count) = (commands.clone(), connections.clone());
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                count.fetch_add(1, Ordering::SeqCst);
                let (handler, log) = (handler.clone(), log.clone());
                thread::spawn(move || serve(stream, handler, log));
            }
        });

        MockServer { addr, commands, connections }
    }

    /// Every command received so far, in arrival order.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }

    /// Command names only.
    pub fn command_names(&self) -> Vec<String> {
        self.commands().into_iter().map(|args| args[0].clone()).collect()
    }

    /// Number of TCP connections accepted.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn client(&self, pool_size: usize) -> KVClient {
        KVClient::with_config(self.config(pool_size)).expect("client")
    }

    pub fn config(&self, pool_size: usize) -> ClientConfig {
        ClientConfig {
            addr: self.addr.clone(),
            pool_size,
            borrow_timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(2),
            write_timeout: Duration::from_secs(2),
            ..ClientConfig::default()
        }
    }
}

fn serve(stream: TcpStream, handler: Arc<Handler>, log: Arc<Mutex<Vec<Vec<String>>>>) {
    let mut writer = stream.try_clone().expect("clone");
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        let args = match read_reply(&mut reader, &mut line) {
            Ok(RespValue::Array(Some(items))) => items
                .into_iter()
                .map(|item| match item {
                    RespValue::Bulk(Some(data)) => String::from_utf8(data).expect("utf8 argument"),
                    other => panic!("command argument must be a bulk string: {other:?}"),
                })
                .collect::<Vec<_>>(),
            _ => return,
        };
        log.lock().unwrap().push(args.clone());

        let mut out = Vec::new();
        match handler(&args) {
            Reply::Value(value) => encode_reply(&value, &mut out),
            Reply::Raw(bytes) => out = bytes,
            Reply::Delay(delay, value) => {
                thread::sleep(delay);
                encode_reply(&value, &mut out);
            }
            Reply::Close => return,
        }
        if writer.write_all(&out).and_then(|_| writer.flush()).is_err() {
            return;
        }
    }
}

pub fn ok() -> RespValue {
    RespValue::Simple("OK".to_string())
}

pub fn bulk(value: &str) -> RespValue {
    RespValue::Bulk(Some(value.as_bytes().to_vec()))
}

pub fn array(values: &[&str]) -> RespValue {
    RespValue::Array(Some(values.iter().map(|v| bulk(v)).collect()))
}

/// Minimal in-memory store; one transaction queue shared by all connections,
/// which is enough for tests that run a single client at a time.
#[derive(Default)]
struct Store {
    strings: HashMap<String, String>,
    lists: HashMap<String, VecDeque<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
    queued: Option<Vec<Vec<String>>>,
}

impl Store {
    fn apply(&mut self, args: &[String]) -> RespValue {
        let name = args[0].as_str();
        if let Some(queue) = self.queued.as_mut() {
            if name != "EXEC" {
                queue.push(args.to_vec());
                return RespValue::Simple("QUEUED".to_string());
            }
        }
        match name {
            "MULTI" => {
                self.queued = Some(Vec::new());
                ok()
            }
            "EXEC" => match self.queued.take() {
                Some(queue) => RespValue::Array(Some(queue.iter().map(|cmd| self.apply(cmd)).collect())),
                None => RespValue::Error("ERR EXEC without MULTI".to_string()),
            },
            "PING" => RespValue::Simple("PONG".to_string()),
            "GET" => RespValue::Bulk(self.strings.get(&args[1]).map(|v| v.as_bytes().to_vec())),
            "SET" => {
                if args.iter().any(|a| a == "NX") && self.strings.contains_key(&args[1]) {
                    return RespValue::Bulk(None);
                }
                self.strings.insert(args[1].clone(), args[2].clone());
                ok()
            }
            "DEL" => {
                let mut deleted = 0;
                for key in &args[1..] {
                    let removed = self.strings.remove(key).is_some()
                        | self.lists.remove(key).is_some()
                        | self.hashes.remove(key).is_some();
                    deleted += removed as i64;
                }
                RespValue::Integer(deleted)
            }
            "INCRBY" => {
                let current: i64 = self.strings.get(&args[1]).map_or(0, |v| v.parse().unwrap());
                let next = current + args[2].parse::<i64>().unwrap();
                self.strings.insert(args[1].clone(), next.to_string());
                RespValue::Integer(next)
            }
            "MGET" => RespValue::Array(Some(
                args[1..]
                    .iter()
                    .map(|k| RespValue::Bulk(self.strings.get(k).map(|v| v.as_bytes().to_vec())))
                    .collect(),
            )),
            "MSET" => {
                for pair in args[1..].chunks(2) {
                    self.strings.insert(pair[0].clone(), pair[1].clone());
                }
                ok()
            }
            "EXISTS" => RespValue::Integer(self.strings.contains_key(&args[1]) as i64),
            "RPUSH" => {
                let list = self.lists.entry(args[1].clone()).or_default();
                list.extend(args[2..].iter().cloned());
                RespValue::Integer(list.len() as i64)
            }
            "LPOP" => RespValue::Bulk(
                self.lists
                    .get_mut(&args[1])
                    .and_then(|list| list.pop_front())
                    .map(String::into_bytes),
            ),
            "LRANGE" => {
                let list: Vec<String> = self.lists.get(&args[1]).map(|l| l.iter().cloned().collect()).unwrap_or_default();
                let len = list.len() as i64;
                let index = |raw: &str| {
                    let value: i64 = raw.parse().unwrap();
                    if value < 0 { (len + value).max(0) } else { value }
                };
                let (start, end) = (index(args[2].as_str()), index(args[3].as_str()).min(len - 1));
                let items = if start > end {
                    Vec::new()
                } else {
                    list[start as usize..=end as usize].iter().map(|v| bulk(v)).collect()
                };
                RespValue::Array(Some(items))
            }
            "HGET" => RespValue::Bulk(
                self.hashes
                    .get(&args[1])
                    .and_then(|h| h.get(&args[2]))
                    .map(|v| v.as_bytes().to_vec()),
            ),
            "HGETALL" => {
                let mut items = Vec::new();
                if let Some(hash) = self.hashes.get(&args[1]) {
                    for (field, value) in hash {
                        items.push(bulk(field));
                        items.push(bulk(value));
                    }
                }
                RespValue::Array(Some(items))
            }
            "HSET" => {
                let hash = self.hashes.entry(args[1].clone()).or_default();
                let created = hash.insert(args[2].clone(), args[3].clone()).is_none();
                RespValue::Integer(created as i64)
            }
            "HMSET" => {
                let hash = self.hashes.entry(args[1].clone()).or_default();
                for pair in args[2..].chunks(2) {
                    hash.insert(pair[0].clone(), pair[1].clone());
                }
                ok()
            }
            "HINCRBY" => {
                let hash = self.hashes.entry(args[1].clone()).or_default();
                let current: i64 = hash.get(&args[2]).map_or(0, |v| v.parse().unwrap());
                let next = current + args[3].parse::<i64>().unwrap();
                hash.insert(args[2].clone(), next.to_string());
                RespValue::Integer(next)
            }
            "HDEL" => {
                let removed = match self.hashes.get_mut(&args[1]) {
                    Some(hash) => args[2..].iter().filter(|f| hash.remove(*f).is_some()).count(),
                    None => 0,
                };
                RespValue::Integer(removed as i64)
            }
            other => RespValue::Error(format!("ERR unknown command '{}'", other)),
        }
    }
}
