//! Outgoing mail abstraction
//!
//! Confirmation codes are delivered out-of-band through a `Mailer`:
//! - Log (writes the message to the application log)
//! - File (one file per message in an outbox directory)
//! - Memory (kept in process, for tests)

use crate::config::{MailBackend, MailConfig};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// A plain-text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Message {
    /// Render as a minimal RFC 5322 document
    pub fn render(&self) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\n\r\n{}\r\n",
            self.from, self.to, self.subject, self.body
        )
    }
}

/// Trait for mail delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: Message) -> Result<()>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// Writes messages to the log instead of sending them
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: Message) -> Result<()> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Mail message"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Stores each message as a file in an outbox directory
pub struct FileMailer {
    outbox: PathBuf,
}

impl FileMailer {
    pub fn new(outbox: impl Into<PathBuf>) -> Self {
        Self {
            outbox: outbox.into(),
        }
    }
}

#[async_trait]
impl Mailer for FileMailer {
    async fn send(&self, message: Message) -> Result<()> {
        tokio::fs::create_dir_all(&self.outbox)
            .await
            .map_err(|e| AppError::Mail {
                message: format!("cannot create outbox {}: {}", self.outbox.display(), e),
            })?;

        let path = self.outbox.join(format!(
            "{}-{}.eml",
            chrono::Utc::now().format("%Y%m%d%H%M%S"),
            Uuid::new_v4()
        ));
        tokio::fs::write(&path, message.render())
            .await
            .map_err(|e| AppError::Mail {
                message: format!("cannot write {}: {}", path.display(), e),
            })?;

        tracing::debug!(path = %path.display(), to = %message.to, "Mail written to outbox");
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Keeps messages in memory
#[derive(Default, Clone)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<Message>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far
    pub fn messages(&self) -> Vec<Message> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    /// Most recent message sent to `to`
    pub fn last_to(&self, to: &str) -> Option<Message> {
        self.messages().into_iter().rev().find(|m| m.to == to)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: Message) -> Result<()> {
        self.outbox
            .lock()
            .map_err(|_| AppError::Mail {
                message: "memory outbox poisoned".to_string(),
            })?
            .push(message);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Create a mailer based on configuration
pub fn create_mailer(config: &MailConfig) -> Arc<dyn Mailer> {
    match config.backend {
        MailBackend::Log => Arc::new(LogMailer),
        MailBackend::File => Arc::new(FileMailer::new(config.outbox_dir.clone())),
    }
}
