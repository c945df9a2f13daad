//! End-to-end decode flow: request facts label the handles their replies
//! produce, and later calls on those handles show the label.

use bytes::{BufMut, BytesMut};

use veles::config::Config;
use veles::dispatch::{Direction, Dispatcher};
use veles::protocol::registry::{OP_CLOSE_HANDLE, OP_OPEN_USER, OP_QUERY_USER_INFO};
use veles::protocol::tree::{Node, Value};
use veles::session::CallContextStore;

const HANDLE: [u8; 20] = [0xaa; 20];

fn put_handle(buf: &mut BytesMut, h: &[u8; 20]) {
    buf.extend_from_slice(h);
}

fn encode_open_user_req(rid: u32) -> BytesMut {
    let mut buf = BytesMut::new();
    put_handle(&mut buf, &[0x11; 20]); // domain handle
    buf.put_u32_le(0x0002_0000); // access mask
    buf.put_u32_le(rid);
    buf
}

fn encode_open_user_reply(h: &[u8; 20], status: u32) -> BytesMut {
    let mut buf = BytesMut::new();
    put_handle(&mut buf, h);
    buf.put_u32_le(status);
    buf
}

fn encode_query_info_req(h: &[u8; 20], level: u16) -> BytesMut {
    let mut buf = BytesMut::new();
    put_handle(&mut buf, h);
    buf.put_u16_le(level);
    buf
}

fn encode_close_req(h: &[u8; 20]) -> BytesMut {
    let mut buf = BytesMut::new();
    put_handle(&mut buf, h);
    buf
}

fn encode_close_reply(status: u32) -> BytesMut {
    let mut buf = BytesMut::new();
    put_handle(&mut buf, &[0u8; 20]);
    buf.put_u32_le(status);
    buf
}

fn opened_as(fields: &Node) -> Option<String> {
    let label = fields.child("handle")?.child("opened_as")?;
    match &label.value {
        Value::Str(s) => Some(s.clone()),
        _ => None,
    }
}

#[test]
fn open_reply_labels_handle_from_request_rid() {
    let d = Dispatcher::new(Config::default());
    let mut store = CallContextStore::default();

    d.decode(
        Direction::Request,
        OP_OPEN_USER,
        1,
        &encode_open_user_req(0x1f4),
        &mut store,
    )
    .unwrap();

    let reply = d
        .decode(
            Direction::Reply,
            OP_OPEN_USER,
            1,
            &encode_open_user_reply(&HANDLE, 0),
            &mut store,
        )
        .unwrap();
    assert_eq!(opened_as(&reply.fields).unwrap(), "user(rid=0x1f4)");
    assert_eq!(store.live_handles(), 1);

    // A later call on the same handle is annotated with the stored label.
    let query = d
        .decode(
            Direction::Request,
            OP_QUERY_USER_INFO,
            2,
            &encode_query_info_req(&HANDLE, 7),
            &mut store,
        )
        .unwrap();
    assert!(opened_as(&query.fields).unwrap().contains("1f4"));
}

#[test]
fn failed_open_registers_nothing() {
    let d = Dispatcher::new(Config::default());
    let mut store = CallContextStore::default();

    d.decode(
        Direction::Request,
        OP_OPEN_USER,
        1,
        &encode_open_user_req(0x200),
        &mut store,
    )
    .unwrap();
    let reply = d
        .decode(
            Direction::Reply,
            OP_OPEN_USER,
            1,
            &encode_open_user_reply(&HANDLE, 0xc000_0022),
            &mut store,
        )
        .unwrap();
    assert!(opened_as(&reply.fields).is_none());
    assert_eq!(store.live_handles(), 0);
}

#[test]
fn redissection_is_idempotent() {
    let d = Dispatcher::new(Config::default());
    let mut store = CallContextStore::default();

    d.decode(
        Direction::Request,
        OP_OPEN_USER,
        1,
        &encode_open_user_req(0x1f4),
        &mut store,
    )
    .unwrap();
    let reply_bytes = encode_open_user_reply(&HANDLE, 0);
    let first = d
        .decode(Direction::Reply, OP_OPEN_USER, 1, &reply_bytes, &mut store)
        .unwrap();
    // A capture viewer decodes the same packet again on redisplay.
    let second = d
        .decode(Direction::Reply, OP_OPEN_USER, 1, &reply_bytes, &mut store)
        .unwrap();
    assert_eq!(opened_as(&first.fields), opened_as(&second.fields));
    assert_eq!(store.live_handles(), 1);
}

#[test]
fn close_reply_forgets_handle() {
    let d = Dispatcher::new(Config::default());
    let mut store = CallContextStore::default();

    d.decode(
        Direction::Request,
        OP_OPEN_USER,
        1,
        &encode_open_user_req(0x1f4),
        &mut store,
    )
    .unwrap();
    d.decode(
        Direction::Reply,
        OP_OPEN_USER,
        1,
        &encode_open_user_reply(&HANDLE, 0),
        &mut store,
    )
    .unwrap();
    assert_eq!(store.live_handles(), 1);

    d.decode(
        Direction::Request,
        OP_CLOSE_HANDLE,
        2,
        &encode_close_req(&HANDLE),
        &mut store,
    )
    .unwrap();
    d.decode(
        Direction::Reply,
        OP_CLOSE_HANDLE,
        2,
        &encode_close_reply(0),
        &mut store,
    )
    .unwrap();
    assert_eq!(store.live_handles(), 0);

    // The handle is gone, so later calls lose the annotation.
    let query = d
        .decode(
            Direction::Request,
            OP_QUERY_USER_INFO,
            3,
            &encode_query_info_req(&HANDLE, 7),
            &mut store,
        )
        .unwrap();
    assert!(opened_as(&query.fields).is_none());
}

#[test]
fn reply_without_request_gets_generic_label() {
    let d = Dispatcher::new(Config::default());
    let mut store = CallContextStore::default();

    // Mid-capture start: the open request was never observed.
    let reply = d
        .decode(
            Direction::Reply,
            OP_OPEN_USER,
            9,
            &encode_open_user_reply(&HANDLE, 0),
            &mut store,
        )
        .unwrap();
    assert_eq!(opened_as(&reply.fields).unwrap(), "user(unknown)");
}

#[test]
fn reset_clears_session_state() {
    let d = Dispatcher::new(Config::default());
    let mut store = CallContextStore::default();

    d.decode(
        Direction::Request,
        OP_OPEN_USER,
        1,
        &encode_open_user_req(0x1f4),
        &mut store,
    )
    .unwrap();
    d.decode(
        Direction::Reply,
        OP_OPEN_USER,
        1,
        &encode_open_user_reply(&HANDLE, 0),
        &mut store,
    )
    .unwrap();
    store.reset();
    assert_eq!(store.live_handles(), 0);

    let query = d
        .decode(
            Direction::Request,
            OP_QUERY_USER_INFO,
            2,
            &encode_query_info_req(&HANDLE, 7),
            &mut store,
        )
        .unwrap();
    assert!(opened_as(&query.fields).is_none());
}
