//! Length-prefixed JSON framing.
//!
//! Each frame is `[4 bytes big-endian u32 length][payload]`.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{GateError, ProtocolErrorKind};

/// Default maximum frame size (1 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1_048_576;

/// Read one frame and return its payload.
pub async fn read_frame<R>(reader: &mut R, max_size: usize) -> Result<Vec<u8>, GateError>
where
    R: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_buf).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => GateError::Protocol {
                kind: ProtocolErrorKind::ConnectionClosed,
            },
            _ => GateError::Io(e),
        });
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_size {
        return Err(GateError::Protocol {
            kind: ProtocolErrorKind::MessageTooLarge {
                size: len,
                max: max_size,
            },
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Write one frame.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), GateError>
where
    W: AsyncWriteExt + Unpin,
{
    let len = u32::try_from(payload.len()).map_err(|_| GateError::Protocol {
        kind: ProtocolErrorKind::MessageTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        },
    })?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read and decode one JSON frame, failing with `ConnectionTimeout` if it
/// does not arrive within `limit`.
pub async fn read_json<R, T>(reader: &mut R, max_size: usize, limit: Duration) -> Result<T, GateError>
where
    R: AsyncReadExt + Unpin,
    T: DeserializeOwned,
{
    let payload = within(limit, read_frame(reader, max_size)).await?;
    serde_json::from_slice(&payload).map_err(|e| GateError::Protocol {
        kind: ProtocolErrorKind::InvalidMessageFormat {
            message: format!("Invalid JSON: {}", e),
        },
    })
}

/// Encode and write one JSON frame within `limit`.
pub async fn write_json<W, T>(writer: &mut W, value: &T, limit: Duration) -> Result<(), GateError>
where
    W: AsyncWriteExt + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(value)?;
    within(limit, write_frame(writer, &payload)).await
}

async fn within<F, T>(limit: Duration, fut: F) -> Result<T, GateError>
where
    F: Future<Output = Result<T, GateError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| GateError::Protocol {
            kind: ProtocolErrorKind::ConnectionTimeout,
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_frame_layout() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, b"hello world").await.unwrap();

        assert_eq!(&buffer[0..4], &[0, 0, 0, 11]);
        assert_eq!(&buffer[4..], b"hello world");

        let mut cursor = Cursor::new(buffer);
        let payload = read_frame(&mut cursor, DEFAULT_MAX_MESSAGE_SIZE).await.unwrap();
        assert_eq!(payload, b"hello world");
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let mut data = vec![0u8; 100];
        data[0..4].copy_from_slice(&2_000_000u32.to_be_bytes());
        let mut cursor = Cursor::new(data);

        let result = read_frame(&mut cursor, DEFAULT_MAX_MESSAGE_SIZE).await;
        assert!(matches!(
            result,
            Err(GateError::Protocol {
                kind: ProtocolErrorKind::MessageTooLarge { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_eof_is_connection_closed() {
        let mut cursor = Cursor::new(Vec::new());
        let result = read_frame(&mut cursor, DEFAULT_MAX_MESSAGE_SIZE).await;
        assert!(matches!(
            result,
            Err(GateError::Protocol {
                kind: ProtocolErrorKind::ConnectionClosed
            })
        ));
    }

    #[tokio::test]
    async fn test_invalid_json_frame() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, b"{not json").await.unwrap();
        let mut cursor = Cursor::new(buffer);

        let result: Result<serde_json::Value, _> =
            read_json(&mut cursor, DEFAULT_MAX_MESSAGE_SIZE, Duration::from_secs(1)).await;
        assert!(matches!(
            result,
            Err(GateError::Protocol {
                kind: ProtocolErrorKind::InvalidMessageFormat { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_read_times_out() {
        let (mut client, _server) = tokio::io::duplex(64);
        let result: Result<serde_json::Value, _> =
            read_json(&mut client, DEFAULT_MAX_MESSAGE_SIZE, Duration::from_millis(20)).await;
        assert!(matches!(
            result,
            Err(GateError::Protocol {
                kind: ProtocolErrorKind::ConnectionTimeout
            })
        ));
    }
}
