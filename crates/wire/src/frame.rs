// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire framing: length-prefixed binary messages over a stream socket.

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::msg::{Message, MsgId};
use crate::types;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Short frame: {size} bytes")]
    ShortFrame { size: usize },
}

/// Bytes taken by the length prefix and the type id.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Upper bound on a whole frame. Clients are locally-trusted system
/// services; anything bigger than this is a framing error, not data.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Encode a message into a complete frame, length prefix included.
pub fn encode(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    let size = FRAME_HEADER_SIZE + msg.payload().len() + msg.extra().len();
    if size > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge { size, max: MAX_FRAME_SIZE });
    }

    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(&(size as u32).to_le_bytes());
    out.extend_from_slice(&msg.id().0.to_le_bytes());
    out.extend_from_slice(msg.payload());
    out.extend_from_slice(msg.extra());
    Ok(out)
}

/// Parse the body of a frame (everything after the length prefix).
///
/// The typed payload length is dictated by the registry; all remaining
/// bytes are the extra blob. Unknown ids keep the whole body as payload so
/// the dispatcher's per-handler size check still applies.
pub fn parse_body(body: &[u8]) -> Result<Message, ProtocolError> {
    if body.len() < 4 {
        return Err(ProtocolError::ShortFrame { size: body.len() + 4 });
    }

    let (id_bytes, rest) = body.split_at(4);
    let id = MsgId(u32::from_le_bytes([id_bytes[0], id_bytes[1], id_bytes[2], id_bytes[3]]));

    let split = match types::payload_size(id) {
        Some(size) if size <= rest.len() => size,
        // Known id but short body: keep it all as payload, the size
        // validation at dispatch reports and drops it.
        _ => rest.len(),
    };
    let (payload, extra) = rest.split_at(split);

    Ok(Message::from_parts(id, payload.to_vec(), extra.to_vec()))
}

/// Read one length-prefixed message from an async reader.
pub async fn read_message<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Message, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(ProtocolError::Io(e)),
    }

    // Total frame length, including the four bytes just read.
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge { size: len, max: MAX_FRAME_SIZE });
    }
    if len < FRAME_HEADER_SIZE {
        return Err(ProtocolError::ShortFrame { size: len });
    }

    let mut body = vec![0u8; len - 4];
    reader.read_exact(&mut body).await?;
    parse_body(&body)
}

/// Write one length-prefixed message to an async writer.
pub async fn write_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &Message,
) -> Result<(), ProtocolError> {
    let frame = encode(msg)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
