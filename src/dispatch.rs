//! Top-level message dispatch: opcode + direction in, labeled field tree out.

use std::error::Error;
use std::fmt;

use log::{debug, warn};

use crate::common::error::CodecError;
use crate::config::Config;
use crate::metrics::METRICS;
use crate::protocol::registry::{self, DecodeCtx};
use crate::protocol::tree::Node;
use crate::session::CallContextStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Reply,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Request => write!(f, "request"),
            Direction::Reply => write!(f, "reply"),
        }
    }
}

/// The decoded form of one captured message.
#[derive(Debug)]
pub struct DecodedMessage {
    pub opcode: u16,
    pub name: &'static str,
    pub direction: Direction,
    pub fields: Node,
}

/// Decode failure. The truncated and malformed cases keep the fields read
/// before the failure point, so a damaged capture still renders partially.
#[derive(Debug)]
pub enum DecodeError {
    UnsupportedOperation(u16),
    Truncated { partial: DecodedMessage },
    Malformed { reason: &'static str, partial: DecodedMessage },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnsupportedOperation(op) => {
                write!(f, "no decoder registered for opcode {}", op)
            }
            DecodeError::Truncated { partial } => {
                write!(f, "payload truncated inside {} {}", partial.name, partial.direction)
            }
            DecodeError::Malformed { reason, partial } => {
                write!(f, "malformed {} {}: {}", partial.name, partial.direction, reason)
            }
        }
    }
}

impl Error for DecodeError {}

/// Stateless decode entry point. Session state lives in the caller-owned
/// [`CallContextStore`] so one dispatcher can serve many captures.
pub struct Dispatcher {
    config: Config,
}

impl Dispatcher {
    pub fn new(config: Config) -> Self {
        Dispatcher { config }
    }

    pub fn decode(
        &self,
        direction: Direction,
        opcode: u16,
        call_id: u64,
        payload: &[u8],
        store: &mut CallContextStore,
    ) -> Result<DecodedMessage, DecodeError> {
        let schema = match registry::lookup(opcode) {
            Some(s) => s,
            None => {
                warn!("unsupported opcode {} ({})", opcode, direction);
                METRICS.inc_unsupported();
                return Err(DecodeError::UnsupportedOperation(opcode));
            }
        };
        let decode_fn = match direction {
            Direction::Request => schema.decode_request,
            Direction::Reply => match schema.decode_reply {
                Some(f) => f,
                None => {
                    warn!("{} has no reply decoder", schema.name);
                    METRICS.inc_unsupported();
                    return Err(DecodeError::UnsupportedOperation(opcode));
                }
            },
        };

        debug!(
            "decoding {} {} (call_id {}, {} bytes)",
            schema.name,
            direction,
            call_id,
            payload.len()
        );
        let mut fields = Node::branch(schema.name);
        let mut cx = DecodeCtx {
            call_id,
            store,
            limits: &self.config.limits,
            secret: self.config.secret.account_password.as_deref(),
        };
        let mut src = payload;
        let result = decode_fn(&mut src, &mut fields, &mut cx);
        let message = DecodedMessage {
            opcode,
            name: schema.name,
            direction,
            fields,
        };
        match result {
            Ok(()) => {
                METRICS.inc_decoded();
                Ok(message)
            }
            Err(CodecError::Short) => {
                warn!("{} {} truncated", message.name, message.direction);
                METRICS.inc_truncated();
                Err(DecodeError::Truncated { partial: message })
            }
            Err(CodecError::Malformed(reason)) => {
                warn!("{} {} malformed: {}", message.name, message.direction, reason);
                METRICS.inc_decoder_rejects();
                Err(DecodeError::Malformed {
                    reason,
                    partial: message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::registry::OP_CONNECT;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Config::default())
    }

    #[test]
    fn unknown_opcode_is_unsupported() {
        let mut store = CallContextStore::default();
        let err = dispatcher()
            .decode(Direction::Request, 0xffff, 1, &[0u8; 8], &mut store)
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedOperation(0xffff)));
    }

    #[test]
    fn empty_payload_is_truncated_with_empty_partial() {
        let mut store = CallContextStore::default();
        let err = dispatcher()
            .decode(Direction::Request, OP_CONNECT, 1, &[], &mut store)
            .unwrap_err();
        match err {
            DecodeError::Truncated { partial } => {
                assert_eq!(partial.opcode, OP_CONNECT);
                assert!(partial.fields.children.is_empty());
            }
            other => panic!("expected truncation, got {}", other),
        }
    }

    #[test]
    fn connect_request_decodes() {
        // null server pointer, access mask
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0x0200_0000u32.to_le_bytes());
        let mut store = CallContextStore::default();
        let msg = dispatcher()
            .decode(Direction::Request, OP_CONNECT, 7, &buf, &mut store)
            .unwrap();
        assert_eq!(msg.name, "connect");
        assert!(msg.fields.child("access_mask").is_some());
    }
}
