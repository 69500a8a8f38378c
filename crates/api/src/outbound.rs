//! Outbound HTTP integrations used by the public contact and careers routes.
//!
//! Each integration sits behind a small trait so routes can be exercised
//! with stubs. [`HttpOutbound`] implements all of them with one shared
//! `reqwest` client; an integration whose configuration is absent fails
//! with [`OutboundError::NotConfigured`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::{AppConfig, CareersConfig, ContactLogConfig, EmailConfig, VerifyConfig};

/// HTTP request timeout for a single outbound call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum OutboundError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}")]
    HttpStatus { service: &'static str, status: u16 },

    #[error("{service} returned an unexpected body: {reason}")]
    Body {
        service: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "address")]
pub enum Recipient {
    /// The configured team inbox.
    Team,
    Address(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: Recipient,
    pub subject: String,
    pub text: String,
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), OutboundError>;
}

#[async_trait]
pub trait BotVerifier: Send + Sync {
    /// `Ok(false)` means the verifier answered and rejected the token.
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, OutboundError>;
}

#[async_trait]
pub trait SubmissionLog: Send + Sync {
    async fn append(&self, record: &Value) -> Result<(), OutboundError>;
}

#[async_trait]
pub trait CareersBoard: Send + Sync {
    /// Open positions, exactly as the recruiting API returns them.
    async fn listings(&self) -> Result<Value, OutboundError>;
}

/// The set of integrations held in application state.
#[derive(Clone)]
pub struct Outbound {
    pub mailer: Arc<dyn Mailer>,
    pub verifier: Arc<dyn BotVerifier>,
    pub submissions: Arc<dyn SubmissionLog>,
    pub careers: Arc<dyn CareersBoard>,
}

impl Outbound {
    /// Every integration backed by one HTTP client built from `config`.
    pub fn http(config: &AppConfig) -> Result<Self, OutboundError> {
        let http = Arc::new(HttpOutbound::new(config)?);
        Ok(Self {
            mailer: http.clone(),
            verifier: http.clone(),
            submissions: http.clone(),
            careers: http,
        })
    }
}

pub struct HttpOutbound {
    client: reqwest::Client,
    email: Option<EmailConfig>,
    verify: Option<VerifyConfig>,
    careers: Option<CareersConfig>,
    contact_log: Option<ContactLogConfig>,
}

impl HttpOutbound {
    pub fn new(config: &AppConfig) -> Result<Self, OutboundError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            email: config.email.clone(),
            verify: config.verify.clone(),
            careers: config.careers.clone(),
            contact_log: config.contact_log.clone(),
        })
    }
}

fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, OutboundError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(OutboundError::HttpStatus {
            service,
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl Mailer for HttpOutbound {
    async fn send(&self, email: &Email) -> Result<(), OutboundError> {
        let config = self
            .email
            .as_ref()
            .ok_or(OutboundError::NotConfigured("email"))?;
        let to = match &email.to {
            Recipient::Team => config.team_inbox.as_str(),
            Recipient::Address(addr) => addr.as_str(),
        };

        let mut body = json!({
            "from": config.from,
            "to": [to],
            "subject": email.subject,
            "text": email.text,
        });
        if let Some(reply_to) = &email.reply_to {
            body["reply_to"] = json!(reply_to);
        }

        let response = self
            .client
            .post(&config.api_url)
            .bearer_auth(&config.api_key)
            .json(&body)
            .send()
            .await?;
        check_status("email API", response)?;
        tracing::debug!(subject = %email.subject, "Email sent");
        Ok(())
    }
}

#[async_trait]
impl BotVerifier for HttpOutbound {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, OutboundError> {
        let config = self
            .verify
            .as_ref()
            .ok_or(OutboundError::NotConfigured("bot verification"))?;

        let mut body = json!({
            "secret": config.secret,
            "response": token,
        });
        if let Some(ip) = remote_ip {
            body["remoteip"] = json!(ip);
        }

        let response = self.client.post(&config.url).json(&body).send().await?;
        let body = check_status("verification endpoint", response)?
            .json::<Value>()
            .await?;
        body["success"].as_bool().ok_or(OutboundError::Body {
            service: "verification endpoint",
            reason: "missing field `success`".to_string(),
        })
    }
}

#[async_trait]
impl SubmissionLog for HttpOutbound {
    async fn append(&self, record: &Value) -> Result<(), OutboundError> {
        let config = self
            .contact_log
            .as_ref()
            .ok_or(OutboundError::NotConfigured("contact log"))?;

        let mut request = self.client.post(&config.url).json(record);
        if let Some(key) = &config.api_key {
            request = request.bearer_auth(key);
        }
        check_status("contact log", request.send().await?)?;
        Ok(())
    }
}

#[async_trait]
impl CareersBoard for HttpOutbound {
    async fn listings(&self) -> Result<Value, OutboundError> {
        let config = self
            .careers
            .as_ref()
            .ok_or(OutboundError::NotConfigured("careers API"))?;

        let response = self
            .client
            .get(&config.api_url)
            .bearer_auth(&config.api_key)
            .send()
            .await?;
        Ok(check_status("careers API", response)?.json::<Value>().await?)
    }
}
