//! TCP transport.
//!
//! Frames travel back to back on a plain TCP stream: a 12-byte header, then
//! exactly `payload_size` bytes. The header is validated before any payload
//! is read, so an oversized length never causes a large read.

use std::net::SocketAddr;

use prioq_proto::{Frame, FrameHeader};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use crate::error::ServerError;

/// Listening TCP endpoint.
#[derive(Debug)]
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Bind to `address` (e.g. `"127.0.0.1:7878"`; port 0 picks a free port).
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` if `address` is not a socket address
    /// - `ServerError::Transport` if the socket cannot be bound
    pub async fn bind(address: &str) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Wait for the next inbound connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ServerError> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok((stream, peer))
    }

    /// Local address the transport is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }
}

/// Read one frame.
///
/// Returns `Ok(None)` on a clean end of stream before the first header byte.
///
/// # Errors
///
/// - `ServerError::Protocol` if the header or frame is malformed
/// - `ServerError::Transport` on I/O failure, including a stream that ends
///   mid-frame
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, ServerError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; FrameHeader::SIZE];

    let first = reader.read(&mut buf[..]).await?;
    if first == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut buf[first..]).await?;

    let payload_size = FrameHeader::from_bytes(&buf)?.payload_size() as usize;
    buf.resize(FrameHeader::SIZE + payload_size, 0);
    reader.read_exact(&mut buf[FrameHeader::SIZE..]).await?;

    Ok(Some(Frame::decode(&buf)?))
}

/// Write one frame and flush it.
///
/// # Errors
///
/// - `ServerError::Protocol` if the frame cannot be encoded
/// - `ServerError::Transport` on I/O failure
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(frame.encoded_len());
    frame.encode(&mut buf)?;

    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use prioq_proto::{ProtocolError, StatusCode};

    use super::*;

    #[tokio::test]
    async fn frames_survive_a_byte_pipe() {
        let (mut client, mut server) = tokio::io::duplex(256);

        let frames = [
            Frame::open(7),
            Frame::write(vec![3]),
            Frame::read(4),
            Frame::reply(StatusCode::QueueEmpty, Bytes::new()),
        ];
        for frame in &frames {
            write_frame(&mut client, frame).await.unwrap();
        }
        drop(client);

        for expected in &frames {
            let frame = read_frame(&mut server).await.unwrap().unwrap();
            assert_eq!(&frame, expected);
        }
        assert!(read_frame(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bad_magic_is_protocol_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[0u8; FrameHeader::SIZE]).await.unwrap();

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, ServerError::Protocol(ProtocolError::InvalidMagic)));
    }

    #[tokio::test]
    async fn stream_ending_mid_frame_is_transport_error() {
        let (mut client, mut server) = tokio::io::duplex(64);

        let mut wire = Vec::new();
        Frame::write(vec![0, 0, 0, 1]).encode(&mut wire).unwrap();
        client.write_all(&wire[..wire.len() - 2]).await.unwrap();
        drop(client);

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, ServerError::Transport(_)));
    }

    #[tokio::test]
    async fn invalid_bind_address_is_config_error() {
        let err = TcpTransport::bind("not an address").await.unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[tokio::test]
    async fn bind_to_ephemeral_port() {
        let transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        assert_ne!(transport.local_addr().unwrap().port(), 0);
    }
}
