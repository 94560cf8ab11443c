//! Mail sender interface for release announcements.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Addressing for an announcement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailHeader {
    /// Sender address
    pub from: String,
    /// Recipient addresses
    pub to: Vec<String>,
}

/// An announcement message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailContent {
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

/// Trait for sending announcement mail.
pub trait MailSender {
    /// Send a message.
    fn send(&self, header: &MailHeader, content: MailContent) -> impl Future<Output = Result<()>>;
}
