use serde::{Deserialize, Serialize};

/// SMTP settings for completion emails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (STARTTLS).
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_password: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}
