//! Boundary and damage handling across every registered operation.

use bytes::{BufMut, BytesMut};

use veles::config::Config;
use veles::dispatch::{DecodeError, Direction, Dispatcher};
use veles::protocol::registry::{self, OP_LOOKUP_DOMAIN, OP_LOOKUP_RIDS, OP_QUERY_DISPLAY_INFO};
use veles::session::CallContextStore;

fn dispatcher() -> Dispatcher {
    Dispatcher::new(Config::default())
}

#[test]
fn three_byte_payload_truncates_every_operation() {
    let d = dispatcher();
    let mut store = CallContextStore::default();
    let stub = [0x41u8, 0x42, 0x43];
    for opcode in registry::opcodes() {
        for direction in [Direction::Request, Direction::Reply] {
            let err = d
                .decode(direction, opcode, 1, &stub, &mut store)
                .unwrap_err();
            assert!(
                matches!(err, DecodeError::Truncated { .. }),
                "opcode {} {:?} did not report truncation",
                opcode,
                direction
            );
        }
    }
}

#[test]
fn unsupported_opcode_leaves_session_untouched() {
    let d = dispatcher();
    let mut store = CallContextStore::default();
    let err = d
        .decode(Direction::Request, 0xffff, 1, &[0u8; 64], &mut store)
        .unwrap_err();
    assert!(matches!(err, DecodeError::UnsupportedOperation(0xffff)));
    assert_eq!(store.live_handles(), 0);
}

#[test]
fn oversized_rid_array_is_rejected_not_allocated() {
    let d = dispatcher();
    let mut store = CallContextStore::default();
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&[0x22; 20]); // handle
    buf.put_u32_le(0xffff_ffff); // rid count far past the cap
    let err = d
        .decode(Direction::Request, OP_LOOKUP_RIDS, 1, &buf, &mut store)
        .unwrap_err();
    match err {
        DecodeError::Malformed { reason, partial } => {
            assert_eq!(reason, "array too large");
            // The handle read before the bad count survives in the partial.
            assert!(partial.fields.child("handle").is_some());
        }
        other => panic!("expected malformed, got {}", other),
    }
}

#[test]
fn oversized_string_count_is_rejected() {
    let d = dispatcher();
    let mut store = CallContextStore::default();
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&[0x22; 20]); // handle
    buf.put_u32_le(0x0010_0002); // byte count above the string cap
    let err = d
        .decode(Direction::Request, OP_LOOKUP_DOMAIN, 1, &buf, &mut store)
        .unwrap_err();
    assert!(matches!(
        err,
        DecodeError::Malformed {
            reason: "string too large",
            ..
        }
    ));
}

#[test]
fn truncation_keeps_fields_read_so_far() {
    let d = dispatcher();
    let mut store = CallContextStore::default();
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&[0x22; 20]); // handle
    buf.put_u16_le(7); // level, then the payload stops
    // query_display_info wants three more u32s after the level.
    let err = d
        .decode(Direction::Request, OP_QUERY_DISPLAY_INFO, 1, &buf, &mut store)
        .unwrap_err();
    match err {
        DecodeError::Truncated { partial } => {
            assert!(partial.fields.child("handle").is_some());
            assert!(partial.fields.child("level").is_some());
            assert!(partial.fields.child("start_index").is_none());
        }
        other => panic!("expected truncation, got {}", other),
    }
}
