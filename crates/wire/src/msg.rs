// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message envelope and the typed-message contract.

use std::fmt;

/// Message type identifier.
///
/// Ids are drawn from the product-wide registry in [`crate::types`]; three
/// federated sources contribute to that registry and must not collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MsgId(pub u32);

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// A message type with a registered id and fixed-size payload layout.
///
/// The payload size is part of the contract: the daemon validates it both
/// when splitting incoming frames and before invoking a handler, which is
/// how drift between a client (or plugin) and the daemon is detected.
pub trait TypedMessage: Sized {
    const ID: MsgId;
    const PAYLOAD_SIZE: usize;

    fn encode_payload(&self, out: &mut Vec<u8>);
    fn decode_payload(payload: &[u8]) -> Option<Self>;
}

/// The atomic unit of daemon communication.
///
/// Carries a type id, the fixed-size payload for that type, and an optional
/// opaque extra blob (typically a NUL-terminated string). Messages own their
/// bytes; queueing one never borrows from the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: MsgId,
    payload: Vec<u8>,
    extra: Vec<u8>,
}

impl Message {
    /// Encode a typed message with no extra bytes.
    pub fn of<M: TypedMessage>(msg: &M) -> Self {
        Self::with_extra(msg, &[])
    }

    /// Encode a typed message with trailing extra bytes.
    pub fn with_extra<M: TypedMessage>(msg: &M, extra: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(M::PAYLOAD_SIZE);
        msg.encode_payload(&mut payload);
        debug_assert_eq!(payload.len(), M::PAYLOAD_SIZE);
        Self { id: M::ID, payload, extra: extra.to_vec() }
    }

    /// Encode a typed message with a string in the extra blob.
    ///
    /// A terminating NUL is appended, matching what C-era clients expect.
    pub fn with_extra_str<M: TypedMessage>(msg: &M, extra: &str) -> Self {
        let mut bytes = Vec::with_capacity(extra.len() + 1);
        bytes.extend_from_slice(extra.as_bytes());
        bytes.push(0);
        Self::with_extra(msg, &bytes)
    }

    /// Assemble a message from already-split parts (frame parsing).
    pub fn from_parts(id: MsgId, payload: Vec<u8>, extra: Vec<u8>) -> Self {
        Self { id, payload, extra }
    }

    pub fn id(&self) -> MsgId {
        self.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn extra(&self) -> &[u8] {
        &self.extra
    }

    /// Whether this message has the given type's id.
    pub fn is<M: TypedMessage>(&self) -> bool {
        self.id == M::ID
    }

    /// Decode the payload as the given type.
    ///
    /// Returns `None` on id mismatch or payload-size drift.
    pub fn decode<M: TypedMessage>(&self) -> Option<M> {
        if self.id != M::ID {
            return None;
        }
        M::decode_payload(&self.payload)
    }

    /// View the extra blob as a string, trimming one trailing NUL if present.
    pub fn extra_str(&self) -> Option<&str> {
        let bytes = match self.extra.split_last() {
            Some((&0, rest)) => rest,
            _ => &self.extra[..],
        };
        std::str::from_utf8(bytes).ok()
    }
}

#[cfg(test)]
#[path = "msg_tests.rs"]
mod tests;
