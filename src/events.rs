//! Outbound JSON lines: bus responses and unsolicited events share one
//! ordered channel drained by a single writer task.

use anyhow::{Context, Result};
use log::{error, warn};
use serde::Serialize;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
    task::JoinHandle,
};

#[derive(Debug, Serialize)]
struct EventLine<'a, T: Serialize> {
    event: &'a str,
    payload: T,
}

#[derive(Clone, Default)]
pub struct EventEmitter {
    sender: Option<mpsc::UnboundedSender<String>>,
}

impl EventEmitter {
    pub fn new(sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Drops everything; for callers that have nowhere to report to.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }

    pub fn emit<T: Serialize>(&self, event: &str, payload: T) -> Result<()> {
        let line = serde_json::to_string(&EventLine { event, payload })
            .with_context(|| format!("failed to serialize '{event}' event"))?;
        self.send_line(line);
        Ok(())
    }

    pub fn send_line(&self, line: String) {
        if let Some(sender) = &self.sender {
            if sender.send(line).is_err() {
                warn!("Output channel closed; dropping line");
            }
        }
    }
}

/// Writes each line followed by `\n` until every sender is dropped.
pub fn spawn_line_writer<W>(mut writer: W, mut lines: mpsc::UnboundedReceiver<String>) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(line) = lines.recv().await {
            let written = async {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await
            }
            .await;
            if let Err(err) = written {
                error!("Failed to write output line: {err}");
                break;
            }
        }
    })
}
