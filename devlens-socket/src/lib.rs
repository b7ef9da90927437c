//! JSON-lines framing: one JSON value per `\n`-terminated line.
//!
//! Used by the editor bridge (server side) and `devlens ctl` (client side).

use std::future::Future;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub const DEFAULT_MAX_FRAME_BYTES: usize = 256 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame exceeds max length ({len} > {max})")]
    TooLong { len: usize, max: usize },

    #[error("frame is not valid UTF-8")]
    NotUtf8,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection closed before a response arrived")]
    Closed,
}

impl FrameError {
    /// Malformed frames can be answered; I/O failures end the connection.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            FrameError::TooLong { .. } | FrameError::NotUtf8 | FrameError::Json(_)
        )
    }
}

/// Reads the next frame. `Ok(None)` means the peer closed the stream.
pub async fn read_frame_with_limit<R, T>(reader: &mut R, max_bytes: usize) -> Result<Option<T>, FrameError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line).await? == 0 {
        return Ok(None);
    }
    if line.len() > max_bytes {
        return Err(FrameError::TooLong {
            len: line.len(),
            max: max_bytes,
        });
    }

    let text = std::str::from_utf8(&line).map_err(|_| FrameError::NotUtf8)?;
    Ok(Some(serde_json::from_str(text.trim_end())?))
}

pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, FrameError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    read_frame_with_limit(reader, DEFAULT_MAX_FRAME_BYTES).await
}

pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Answers every request frame on `stream` until the peer hangs up.
///
/// Malformed frames get `on_malformed`'s response and the loop continues.
pub async fn serve_connection<Req, Resp, F, Fut, M>(
    stream: UnixStream,
    handler: F,
    on_malformed: M,
) -> Result<(), FrameError>
where
    Req: DeserializeOwned,
    Resp: Serialize,
    F: Fn(Req) -> Fut,
    Fut: Future<Output = Resp>,
    M: Fn(&FrameError) -> Resp,
{
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let request = match read_frame::<_, Req>(&mut reader).await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(e) if e.is_malformed() => {
                write_frame(&mut writer, &on_malformed(&e)).await?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let response = handler(request).await;
        write_frame(&mut writer, &response).await?;
    }
}

/// Connects to `path`, sends one request and waits for its response.
pub async fn request<Req, Resp>(path: impl AsRef<Path>, req: &Req) -> Result<Resp, FrameError>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let stream = UnixStream::connect(path.as_ref()).await?;
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    write_frame(&mut writer, req).await?;
    read_frame(&mut reader).await?.ok_or(FrameError::Closed)
}
