//! Length-prefixed binary framing used by [`crate::tcp::TcpTransport`].
//!
//! Each frame is a 4-byte big-endian length followed by that many bytes of
//! `postcard`-encoded payload. There is no bit-exact compatibility guarantee
//! with any other wire protocol; only the two ends of a Voltra transport pair
//! need to agree on this framing.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::TransportError;

/// Frames larger than this are rejected on read, to bound memory use if a
/// peer sends a corrupt or malicious length prefix.
const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), TransportError> {
    let len = u32::try_from(payload.len())
        .map_err(|_| TransportError::Communication("frame too large to encode".into()))?;
    writer
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|e| TransportError::Communication(e.to_string()))?;
    writer
        .write_all(payload)
        .await
        .map_err(|e| TransportError::Communication(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| TransportError::Communication(e.to_string()))
}

pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| TransportError::Communication(e.to_string()))?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(TransportError::Communication(format!(
            "frame length {len} exceeds maximum {MAX_FRAME_LEN}"
        )));
    }
    let mut buf = vec![0u8; len as usize];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| TransportError::Communication(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_roundtrips_through_a_duplex_pipe() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_frame(&mut a, b"hello").await.unwrap();
        let got = read_frame(&mut b).await.unwrap();
        assert_eq!(got, b"hello");
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(16);
        a.write_all(&(MAX_FRAME_LEN + 1).to_be_bytes())
            .await
            .unwrap();
        let err = read_frame(&mut b).await.unwrap_err();
        assert!(matches!(err, TransportError::Communication(_)));
    }
}
