//! Single request/response exchange with a running daemon.

use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use typefetch_core::VERSION;
use typefetch_daemon::ipc::IpcStream;
use typefetch_proto::{decode_frame, encode_frame, frame_len, Frame, FrameResponse, Request};

/// Send `request` to the daemon at `endpoint` and wait for its reply.
pub async fn send(endpoint: &str, request: Request) -> io::Result<FrameResponse> {
    let mut stream = IpcStream::connect(endpoint).await?;

    let encoded = encode_frame(&Frame::new(VERSION, request))?;
    stream.write_all(&encoded).await?;
    stream.flush().await?;

    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let mut buf = vec![0u8; frame_len(len_buf)?];
    stream.read_exact(&mut buf).await?;

    decode_frame(&buf)
}
