use std::mem::size_of;

use hexlink_core::frame::{Frame, Header};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use zerocopy::{FromBytes, IntoBytes};

/// Reads one fixed-size record.
///
/// A short read surfaces as [`std::io::ErrorKind::UnexpectedEof`], which the
/// callers treat as a closed connection, never as an encoding error.
pub async fn read_record<R, F>(reader: &mut R) -> std::io::Result<F>
where
    R: AsyncRead + Unpin,
    F: FromBytes + IntoBytes,
{
    let mut record = F::new_zeroed();
    reader.read_exact(record.as_mut_bytes()).await?;
    Ok(record)
}

/// Writes a header and its payload as one contiguous frame.
pub async fn write_frame<W, F>(writer: &mut W, header: &Header, payload: &F) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    F: Frame,
{
    let mut buffer = Vec::with_capacity(size_of::<Header>() + size_of::<F>());
    buffer.extend_from_slice(header.as_bytes());
    buffer.extend_from_slice(payload.as_bytes());
    writer.write_all(&buffer).await
}

/// Discards exactly `len` bytes, resynchronizing the stream after an
/// unrecognized frame ID.
pub async fn discard<R>(reader: &mut R, len: usize) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer).await.map(|_| ())
}
