//! # rr-mail-local
//! Filesystem implementation of `Mailer`.
//! Each message lands in the outbox directory as one `.eml` file, ready to be
//! picked up by a relay or read by hand during development.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use rr_core::models::OutboundMail;
use rr_core::traits::Mailer;
use tokio::fs;
use tracing::info;

pub struct LocalOutboxMailer {
    /// Directory receiving the messages (e.g., "./data/outbox")
    outbox: PathBuf,
}

impl LocalOutboxMailer {
    pub fn new(outbox: impl Into<PathBuf>) -> Self {
        Self { outbox: outbox.into() }
    }

    pub fn outbox(&self) -> &Path {
        &self.outbox
    }

    /// "20240101T120000Z-<uuid>.eml": sorts by arrival, never collides.
    fn message_path(&self) -> PathBuf {
        let name = format!("{}-{}.eml", Utc::now().format("%Y%m%dT%H%M%S%.3fZ"), uuid::Uuid::new_v4());
        self.outbox.join(name)
    }
}

/// Renders a minimal RFC 5322 message.
fn render(mail: &OutboundMail) -> String {
    format!(
        "From: {}\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
        mail.from,
        mail.to,
        mail.subject,
        Utc::now().to_rfc2822(),
        mail.body
    )
}

#[async_trait]
impl Mailer for LocalOutboxMailer {
    async fn send(&self, mail: OutboundMail) -> anyhow::Result<()> {
        fs::create_dir_all(&self.outbox)
            .await
            .with_context(|| format!("creating outbox {}", self.outbox.display()))?;

        let path = self.message_path();
        fs::write(&path, render(&mail))
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        info!(to = %mail.to, path = %path.display(), "mail queued");
        Ok(())
    }
}
