mod common;

use std::time::Duration;

use common::{MockServer, Reply};
use respkv_client::{ClientError, ClientTtl, ErrorKind, RespValue};

#[test]
fn set_get_roundtrip() {
    let server = MockServer::store();
    let client = server.client(1);
    let strings = client.strings();

    strings.set("key", "value").expect("set");
    assert_eq!(strings.get("key").expect("get"), Some("value".to_string()));
    assert_eq!(strings.get("missing").expect("get"), None);
    assert!(strings.exists("key").expect("exists"));
    assert_eq!(strings.delete(&["key", "missing"]).expect("del"), 1);
    assert!(!strings.exists("key").expect("exists"));
}

#[test]
fn empty_value_is_not_nil() {
    let server = MockServer::store();
    let client = server.client(1);

    client.strings().set("blank", "").expect("set");
    assert_eq!(client.strings().get("blank").expect("get"), Some(String::new()));
}

#[test]
fn set_if_absent_and_expiration_frames() {
    let server = MockServer::store();
    let client = server.client(1);
    let strings = client.strings();

    assert!(strings
        .set_if_absent("lock", "owner-1", Duration::from_secs(30))
        .expect("set nx"));
    assert!(!strings
        .set_if_absent("lock", "owner-2", Duration::from_secs(30))
        .expect("set nx"));
    strings
        .set_with_expiration("session", "data", Duration::from_millis(1500))
        .expect("set px");

    let commands = server.commands();
    assert_eq!(commands[0], vec!["SET", "lock", "owner-1", "NX", "PX", "30000"]);
    assert_eq!(commands[2], vec!["SET", "session", "data", "PX", "1500"]);
    assert_eq!(strings.get("lock").expect("get"), Some("owner-1".to_string()));
}

#[test]
fn increase_by_multi_get_and_multi_set() {
    let server = MockServer::store();
    let client = server.client(1);
    let strings = client.strings();

    assert_eq!(strings.increase_by("visits", 3).expect("incrby"), 3);
    strings
        .multi_set(&[("a", "1"), ("b", "2")])
        .expect("mset");
    assert_eq!(
        strings.multi_get(&["a", "missing", "b"]).expect("mget"),
        vec![Some("1".to_string()), None, Some("2".to_string())]
    );
}

#[test]
fn expire_and_ttl() {
    let server = MockServer::scripted(|args| match args[0].as_str() {
        "PEXPIRE" => Reply::Value(RespValue::Integer(1)),
        "PTTL" => match args[1].as_str() {
            "gone" => Reply::Value(RespValue::Integer(-2)),
            "forever" => Reply::Value(RespValue::Integer(-1)),
            _ => Reply::Value(RespValue::Integer(2500)),
        },
        other => panic!("unexpected command {other}"),
    });
    let client = server.client(1);
    let strings = client.strings();

    assert!(strings.expire("key", Duration::from_secs(3)).expect("expire"));
    assert_eq!(strings.ttl("gone").expect("ttl"), ClientTtl::Missing);
    assert_eq!(strings.ttl("forever").expect("ttl"), ClientTtl::NoExpiry);
    assert_eq!(
        strings.ttl("key").expect("ttl"),
        ClientTtl::ExpiresIn(Duration::from_millis(2500))
    );
    assert_eq!(server.commands()[0], vec!["PEXPIRE", "key", "3000"]);
}

#[test]
fn server_error_keeps_message_and_evicts_connection() {
    let server = MockServer::scripted(|args| match args[0].as_str() {
        "INCRBY" => Reply::Value(RespValue::Error(
            "ERR value is not an integer or out of range".to_string(),
        )),
        _ => Reply::Value(common::ok()),
    });
    let client = server.client(1);

    let err = client.strings().increase_by("name", 1).unwrap_err();
    match &err {
        ClientError::Server(message) => {
            assert_eq!(message, "ERR value is not an integer or out of range")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Protocol);

    client.strings().set("name", "x").expect("set");
    assert_eq!(server.connections(), 2);
}

#[test]
fn rejects_invalid_input_before_io() {
    let server = MockServer::store();
    let client = server.client(1);
    let no_keys: [&str; 0] = [];
    let no_pairs: [(&str, &str); 0] = [];

    assert!(matches!(client.strings().delete(&no_keys), Err(ClientError::InvalidInput(_))));
    assert!(matches!(client.strings().multi_get(&no_keys), Err(ClientError::InvalidInput(_))));
    assert!(matches!(client.strings().multi_set(&no_pairs), Err(ClientError::InvalidInput(_))));
    assert!(matches!(
        client.strings().set_with_expiration("key", "v", Duration::ZERO),
        Err(ClientError::InvalidInput(_))
    ));
    assert!(matches!(client.strings().get(""), Err(ClientError::InvalidInput(_))));
    assert_eq!(server.connections(), 0);
}
