// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Progress / verbosity channel.
//!
//! Engines only ever push events into a sink. Sinks must not block, so the
//! channel sink is backed by an unbounded sender and drops events once the
//! receiver is gone.

use parking_lot::Mutex;
use std::io::Write;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A task with a known amount of work starts
    Started { label: String, total: u64 },
    /// One unit of work done
    Advanced,
    /// Human-readable line
    Message(String),
    Finished,
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards everything
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Logs task boundaries through tracing. Message lines only go to the
/// attached line writer, never to tracing, since they may carry credentials.
#[derive(Default)]
pub struct TracingProgress {
    lines: Option<Mutex<Box<dyn Write + Send>>>,
}

impl TracingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain output for message lines, e.g. stderr when it is not a terminal
    pub fn with_lines(mut self, writer: impl Write + Send + 'static) -> Self {
        self.lines = Some(Mutex::new(Box::new(writer)));
        self
    }
}

impl ProgressSink for TracingProgress {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { label, total } => info!("{} ({} requests)", label, total),
            ProgressEvent::Finished => debug!("Progress finished"),
            ProgressEvent::Message(line) => {
                if let Some(lines) = &self.lines {
                    let _ = writeln!(lines.lock(), "{}", line);
                }
            }
            ProgressEvent::Advanced => {}
        }
    }
}

#[derive(Clone)]
pub struct ChannelProgress {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelProgress {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_channel_progress_delivers_in_order() {
        let (sink, mut rx) = ChannelProgress::new();
        sink.emit(ProgressEvent::Started {
            label: "x".into(),
            total: 2,
        });
        sink.emit(ProgressEvent::Advanced);
        sink.emit(ProgressEvent::Message("done".into()));

        assert_eq!(
            rx.recv().await,
            Some(ProgressEvent::Started {
                label: "x".into(),
                total: 2
            })
        );
        assert_eq!(rx.recv().await, Some(ProgressEvent::Advanced));
        assert_eq!(rx.recv().await, Some(ProgressEvent::Message("done".into())));
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_tracing_progress_writes_message_lines() {
        let buffer = SharedBuffer::default();
        let sink = TracingProgress::new().with_lines(buffer.clone());

        sink.emit(ProgressEvent::Started {
            label: "Brute forcing admin".into(),
            total: 2,
        });
        sink.emit(ProgressEvent::Advanced);
        sink.emit(ProgressEvent::Message("[SUCCESS] Login: admin Password: b".into()));
        sink.emit(ProgressEvent::Finished);

        let written = String::from_utf8(buffer.0.lock().clone()).unwrap();
        assert_eq!(written, "[SUCCESS] Login: admin Password: b\n");

        // Without a line writer messages are dropped
        TracingProgress::new().emit(ProgressEvent::Message("x".into()));
    }

    #[test]
    fn test_channel_progress_survives_dropped_receiver() {
        let (sink, rx) = ChannelProgress::new();
        drop(rx);
        sink.emit(ProgressEvent::Finished);
    }
}
