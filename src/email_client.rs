//! src/email_client.rs

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};

use crate::configurations::{EmailClientSettings, MissingMailSecrets};

pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: String,
    authorization_token: Secret<String>,
}

/// One message as the relay hands it to the provider.
pub struct Email<'a> {
    pub recipient: &'a str,
    pub bcc: Option<&'a str>,
    pub reply_to: Option<&'a str>,
    pub subject: &'a str,
    pub html_content: &'a str,
    pub text_content: &'a str,
}

#[derive(thiserror::Error, Debug)]
pub enum EmailError {
    #[error("Failed to reach the email provider")]
    Transport(#[from] reqwest::Error),
    #[error("The email provider rejected the message with status {status}: {detail}")]
    Rejected { status: StatusCode, detail: String },
}

impl EmailClient {
    pub fn new(
        http_client: Client,
        base_url: String,
        sender: String,
        authorization_token: Secret<String>,
    ) -> Self {
        Self {
            http_client,
            base_url,
            sender,
            authorization_token,
        }
    }

    pub async fn send_email(&self, email: &Email<'_>) -> Result<(), EmailError> {
        let url = format!("{}/v3/mail/send", self.base_url.trim_end_matches('/'));
        let request_body = SendEmailRequest {
            personalizations: [Personalization {
                to: [Address { email: email.recipient }],
                bcc: email.bcc.map(|email| [Address { email }]),
            }],
            from: Address { email: &self.sender },
            reply_to: email.reply_to.map(|email| Address { email }),
            subject: email.subject,
            content: [
                Content {
                    content_type: "text/plain",
                    value: email.text_content,
                },
                Content {
                    content_type: "text/html",
                    value: email.html_content,
                },
            ],
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.authorization_token.expose_secret())
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(EmailError::Rejected {
            status,
            detail: provider_error_detail(&body),
        })
    }
}

#[derive(serde::Serialize)]
struct SendEmailRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<Address<'a>>,
    subject: &'a str,
    content: [Content<'a>; 2],
}

#[derive(serde::Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    bcc: Option<[Address<'a>; 1]>,
}

#[derive(serde::Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(serde::Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(serde::Deserialize)]
struct ProviderErrors {
    errors: Vec<ProviderError>,
}

#[derive(serde::Deserialize)]
struct ProviderError {
    message: String,
    field: Option<String>,
}

/// Flattens the provider's `{"errors": [...]}` payload; anything else is kept verbatim.
fn provider_error_detail(body: &str) -> String {
    match serde_json::from_str::<ProviderErrors>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed
            .errors
            .into_iter()
            .map(|e| match e.field {
                Some(field) => format!("{} ({})", e.message, field),
                None => e.message,
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ if body.trim().is_empty() => "<empty body>".to_string(),
        _ => body.to_string(),
    }
}

/// Where a lead notification goes besides the submitter.
#[derive(Debug, Clone)]
pub struct MailRoute {
    pub sales_recipient: String,
    pub bcc: Option<String>,
}

/// Shared, read-only mail state. Settings are checked per request so a
/// half-configured deployment answers every lead with a configuration error.
pub struct LeadMailer {
    http_client: Client,
    settings: EmailClientSettings,
}

impl LeadMailer {
    pub fn from_settings(settings: EmailClientSettings) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            http_client,
            settings,
        })
    }

    pub fn check(&self) -> Result<(), MissingMailSecrets> {
        self.settings.resolve().map(|_| ())
    }

    pub fn connect(&self) -> Result<(EmailClient, MailRoute), MissingMailSecrets> {
        let secrets = self.settings.resolve()?;
        let client = EmailClient::new(
            self.http_client.clone(),
            self.settings.base_url.clone(),
            secrets.sender_email,
            secrets.api_key,
        );
        let route = MailRoute {
            sales_recipient: secrets.sales_recipient,
            bcc: secrets.bcc_email,
        };
        Ok((client, route))
    }
}
