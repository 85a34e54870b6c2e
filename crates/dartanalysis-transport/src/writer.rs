//! The write loop
//!
//! One task per connection owns the server's stdin. Callers hand it whole
//! frames over a channel and wait for the acknowledgement; a frame that
//! reached the task is always written completely, even if its caller has
//! stopped waiting, so the stream never carries half a line.

use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, oneshot};

/// One serialized message, newline included
#[derive(Debug)]
pub struct Frame {
    /// Bytes to write
    pub line: Vec<u8>,
    /// Receives the outcome once the frame is flushed
    pub done: oneshot::Sender<io::Result<()>>,
}

/// Write frames in arrival order until the channel closes or a write fails
///
/// Frames still queued after a failed write are dropped, so their callers
/// see the channel close.
pub async fn run_write_loop<W>(writer: W, mut frames: mpsc::UnboundedReceiver<Frame>)
where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(writer);

    while let Some(frame) = frames.recv().await {
        let result = write_frame(&mut writer, &frame.line).await;
        let failed = result.is_err();
        if let Err(e) = &result {
            tracing::warn!(error = %e, "error writing to server");
        }
        // The caller may have stopped waiting.
        let _ = frame.done.send(result);
        if failed {
            return;
        }
    }

    tracing::debug!("write channel closed");
    let _ = writer.shutdown().await;
}

async fn write_frame<W>(writer: &mut BufWriter<W>, line: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(line: &str) -> (Frame, oneshot::Receiver<io::Result<()>>) {
        let (done, ack) = oneshot::channel();
        (
            Frame {
                line: line.as_bytes().to_vec(),
                done,
            },
            ack,
        )
    }

    #[tokio::test]
    async fn test_frames_are_written_in_order() {
        let writer = tokio_test::io::Builder::new()
            .write(b"{\"id\":\"1\"}\n")
            .write(b"{\"id\":\"2\"}\n")
            .build();
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_write_loop(writer, rx));

        let (first, first_ack) = frame("{\"id\":\"1\"}\n");
        let (second, second_ack) = frame("{\"id\":\"2\"}\n");
        tx.send(first).unwrap();
        tx.send(second).unwrap();

        first_ack.await.unwrap().unwrap();
        second_ack.await.unwrap().unwrap();
        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_frame_is_written_after_caller_gives_up() {
        let writer = tokio_test::io::Builder::new()
            .write(b"{\"id\":\"1\"}\n")
            .build();
        let (tx, rx) = mpsc::unbounded_channel();

        let (first, ack) = frame("{\"id\":\"1\"}\n");
        drop(ack);
        tx.send(first).unwrap();
        drop(tx);

        // The mock panics on drop if the expected bytes were never written.
        run_write_loop(writer, rx).await;
    }

    #[tokio::test]
    async fn test_write_error_stops_loop() {
        let writer = tokio_test::io::Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_write_loop(writer, rx));

        let (first, first_ack) = frame("{}\n");
        let (second, second_ack) = frame("{}\n");
        tx.send(first).unwrap();
        let _ = tx.send(second);

        let err = first_ack.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(second_ack.await.is_err());
        task.await.unwrap();
    }
}
