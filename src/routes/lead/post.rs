//! src/routes/lead/post.rs

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use chrono::Utc;
use uuid::Uuid;

use crate::configurations::MissingMailSecrets;
use crate::domain::{LeadSubmission, MissingFields, RequiredText};
use crate::email_client::{Email, EmailClient, EmailError, LeadMailer, MailRoute};
use crate::routes::lead::emails::{acknowledgment, sales_notification};
use crate::utils::error_chain_fmt;

/// The contact modal's payload. Every field may be absent.
#[derive(serde::Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LeadForm {
    first_name: Option<String>,
    last_name: Option<String>,
    company: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    message: Option<String>,
    model_code: Option<String>,
    source: Option<String>,
    page: Option<String>,
    variant: Option<String>,
    ua: Option<String>,
}

impl TryFrom<LeadForm> for LeadSubmission {
    type Error = MissingFields;

    fn try_from(form: LeadForm) -> Result<Self, Self::Error> {
        let first_name = RequiredText::parse(form.first_name);
        let last_name = RequiredText::parse(form.last_name);
        let company = RequiredText::parse(form.company);
        let email = RequiredText::parse(form.email);

        match (first_name, last_name, company, email) {
            (Some(first_name), Some(last_name), Some(company), Some(email)) => Ok(LeadSubmission {
                first_name,
                last_name,
                company,
                email,
                phone: LeadSubmission::optional(form.phone),
                message: LeadSubmission::optional(form.message),
                model_code: LeadSubmission::optional(form.model_code),
                source: LeadSubmission::optional(form.source),
                page: LeadSubmission::optional(form.page),
                variant: LeadSubmission::optional(form.variant),
                user_agent: LeadSubmission::optional(form.ua),
            }),
            (first_name, last_name, company, email) => Err(MissingFields::from_flags([
                ("firstName", first_name.is_none()),
                ("lastName", last_name.is_none()),
                ("company", company.is_none()),
                ("email", email.is_none()),
            ])),
        }
    }
}

#[derive(serde::Serialize)]
pub struct LeadResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// The `Display` of each variant is the `error` string handed to the caller;
/// the source carries what goes to the log.
#[derive(thiserror::Error)]
pub enum LeadError {
    #[error("Invalid request body")]
    MalformedBody(#[source] serde_json::Error),
    #[error("Missing required fields")]
    ValidationError(#[source] MissingFields),
    #[error("Mail secrets not configured")]
    MissingConfiguration(#[source] MissingMailSecrets),
    #[error("Email send failed")]
    SendEmailError(#[source] anyhow::Error),
}

impl std::fmt::Debug for LeadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for LeadError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedBody(_) | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::MissingConfiguration(_) | Self::SendEmailError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(LeadResponse {
            ok: false,
            error: Some(self.to_string()),
        })
    }
}

impl From<MissingFields> for LeadError {
    fn from(value: MissingFields) -> Self {
        Self::ValidationError(value)
    }
}

impl From<MissingMailSecrets> for LeadError {
    fn from(value: MissingMailSecrets) -> Self {
        Self::MissingConfiguration(value)
    }
}

#[tracing::instrument(
    name = "Relaying a new lead",
    skip(body, mailer),
    fields(
        request_id = %Uuid::new_v4(),
        lead_email = tracing::field::Empty,
        lead_company = tracing::field::Empty,
    )
)]
pub async fn submit_lead(
    // Raw bytes rather than `web::Json`: its extractor rejects a missing or
    // non-JSON content type and a bad body with actix's own error page, while
    // every outcome here must be the `{ ok, error }` shape.
    body: web::Bytes,
    mailer: web::Data<LeadMailer>,
) -> Result<HttpResponse, LeadError> {
    match relay_lead(&body, &mailer).await {
        Ok(()) => Ok(HttpResponse::Ok().json(LeadResponse {
            ok: true,
            error: None,
        })),
        Err(e) => {
            if e.status_code().is_server_error() {
                tracing::error!(error.cause_chain = ?e, error.message = %e, "Failed to relay the lead");
            } else {
                tracing::warn!(error.cause_chain = ?e, error.message = %e, "Rejected a lead submission");
            }
            Err(e)
        }
    }
}

async fn relay_lead(body: &[u8], mailer: &LeadMailer) -> Result<(), LeadError> {
    let submission: LeadSubmission = parse_lead_form(body)?.try_into()?;

    let span = tracing::Span::current();
    span.record("lead_email", &tracing::field::display(&submission.email));
    span.record("lead_company", &tracing::field::display(&submission.company));

    let (email_client, route) = mailer.connect()?;

    send_sales_notification(&email_client, &route, &submission)
        .await
        .context("Failed to send the sales notification")
        .map_err(LeadError::SendEmailError)?;
    send_acknowledgment(&email_client, &submission)
        .await
        .context("Failed to send the acknowledgment email")
        .map_err(LeadError::SendEmailError)?;

    Ok(())
}

/// An empty body reads as an empty form, so it fails field validation
/// instead of JSON parsing. The same goes for JSON that is not an object.
fn parse_lead_form(body: &[u8]) -> Result<LeadForm, LeadError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(LeadForm::default());
    }
    match serde_json::from_slice(body).map_err(LeadError::MalformedBody)? {
        // A derived `Deserialize` also fills a struct from a sequence by
        // position; only named fields may populate the form.
        value @ serde_json::Value::Object(_) => {
            serde_json::from_value(value).map_err(LeadError::MalformedBody)
        }
        _ => Ok(LeadForm::default()),
    }
}

#[tracing::instrument(
    name = "Sending the sales notification",
    skip(email_client, route, submission)
)]
async fn send_sales_notification(
    email_client: &EmailClient,
    route: &MailRoute,
    submission: &LeadSubmission,
) -> Result<(), EmailError> {
    let composed = sales_notification(submission, Utc::now());
    email_client
        .send_email(&Email {
            recipient: &route.sales_recipient,
            bcc: route.bcc.as_deref(),
            reply_to: Some(submission.email.as_ref()),
            subject: &composed.subject,
            html_content: &composed.html,
            text_content: &composed.text,
        })
        .await
}

#[tracing::instrument(
    name = "Sending the acknowledgment email",
    skip(email_client, submission)
)]
async fn send_acknowledgment(
    email_client: &EmailClient,
    submission: &LeadSubmission,
) -> Result<(), EmailError> {
    let composed = acknowledgment(submission);
    email_client
        .send_email(&Email {
            recipient: submission.email.as_ref(),
            bcc: None,
            reply_to: None,
            subject: &composed.subject,
            html_content: &composed.html,
            text_content: &composed.text,
        })
        .await
}
