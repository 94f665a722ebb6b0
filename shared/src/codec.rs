//! Length-framed bincode codec for TCP streams.
//!
//! The transport contract is "ordered, whole messages": each frame is a 4-byte
//! big-endian length followed by a bincode-encoded [`Message`]. A frame that
//! fails to decode is dropped with a warning; only I/O failures and oversized
//! frames end the connection.

use crate::protocol::Message;
use log::warn;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame. Snapshots for a two-player world are a few
/// hundred bytes, so anything near this size is a corrupt stream.
pub const MAX_FRAME_SIZE: u32 = 64 * 1024;

/// Serializes and writes one message frame.
pub async fn write_message<W>(writer: &mut W, message: &Message) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = bincode::serialize(message)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame and decodes it.
///
/// Returns `Ok(None)` for a well-framed but undecodable payload (logged and
/// dropped). Returns `Err` on I/O failure, EOF, or an oversized frame.
pub async fn read_message<R>(reader: &mut R) -> io::Result<Option<Message>>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await?;
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;

    match bincode::deserialize::<Message>(&payload) {
        Ok(message) => Ok(Some(message)),
        Err(e) => {
            warn!("Dropping undecodable {}-byte frame: {}", len, e);
            Ok(None)
        }
    }
}
