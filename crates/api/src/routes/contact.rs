//! `POST /api/contact`: the public contact form.
//!
//! Required fields are checked first, then the bot-verification token. The
//! submission is logged to the spreadsheet API and recorded as a lead on a
//! best-effort basis; the two emails (team notice and sender confirmation)
//! must both go out for the request to succeed.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::{Validate, ValidationErrors};

use crate::outbound::{Email, OutboundError, Recipient};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/contact", post(contact))
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 120, message = "Please tell us your name."))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[validate(length(min = 1, max = 5000, message = "Please include a message."))]
    pub message: String,
    /// Bot-verification token from the form widget.
    #[serde(default, alias = "turnstileToken", alias = "cf-turnstile-response", skip_serializing)]
    pub token: String,
}

impl ContactRequest {
    fn sanitize(&mut self) {
        for field in [&mut self.name, &mut self.email, &mut self.message, &mut self.token] {
            *field = field.trim().to_string();
        }
        for field in [
            &mut self.phone,
            &mut self.company,
            &mut self.service,
            &mut self.budget,
        ] {
            *field = field
                .take()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
        }
    }

    fn summary(&self) -> String {
        let optional = [
            ("Phone", &self.phone),
            ("Company", &self.company),
            ("Service", &self.service),
            ("Budget", &self.budget),
        ];
        let mut text = format!("Name: {}\nEmail: {}\n", self.name, self.email);
        for (label, value) in optional {
            if let Some(v) = value {
                text.push_str(&format!("{label}: {v}\n"));
            }
        }
        text.push_str(&format!("\n{}\n", self.message));
        text
    }
}

#[derive(Debug, Serialize)]
pub struct ContactReply {
    pub ok: bool,
    pub message: String,
}

fn reply(status: StatusCode, ok: bool, message: &str) -> (StatusCode, Json<ContactReply>) {
    (
        status,
        Json(ContactReply {
            ok,
            message: message.to_string(),
        }),
    )
}

/// Field order on the form, so the banner names the first field a visitor
/// would fix.
const FORM_ORDER: [&str; 3] = ["name", "email", "message"];

fn form_position(field: &str) -> usize {
    FORM_ORDER
        .iter()
        .position(|f| *f == field)
        .unwrap_or(FORM_ORDER.len())
}

fn first_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| form_position(&field[..]));
    fields
        .iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Please check the form and try again.".to_string())
}

/// Client address as reported by the edge proxy, if any.
fn remote_ip(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("cf-connecting-ip")
        .or_else(|| headers.get("x-forwarded-for"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

async fn contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> (StatusCode, Json<ContactReply>) {
    let mut form = match payload {
        Ok(Json(form)) => form,
        Err(rejection) => {
            tracing::info!(error = %rejection, "Unreadable contact submission");
            return reply(StatusCode::BAD_REQUEST, false, "Please fill in the required fields.");
        }
    };
    form.sanitize();
    if let Err(errors) = form.validate() {
        return reply(StatusCode::BAD_REQUEST, false, &first_message(&errors));
    }
    if form.token.is_empty() {
        return reply(StatusCode::BAD_REQUEST, false, "Please complete the verification.");
    }

    let outbound = state.outbound();
    match outbound.verifier.verify(&form.token, remote_ip(&headers)).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!("Contact submission failed bot verification");
            return reply(StatusCode::BAD_REQUEST, false, "Verification failed. Please try again.");
        }
        Err(e) => {
            tracing::error!(error = %e, "Bot verification unavailable");
            return reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                false,
                "We could not verify your submission. Please try again later.",
            );
        }
    }

    let record = json!({
        "submitted_at": Utc::now(),
        "name": form.name,
        "email": form.email,
        "phone": form.phone,
        "company": form.company,
        "service": form.service,
        "budget": form.budget,
        "message": form.message,
    });
    match outbound.submissions.append(&record).await {
        Ok(()) => {}
        Err(OutboundError::NotConfigured(_)) => {
            tracing::debug!("Contact log not configured; skipping");
        }
        Err(e) => tracing::warn!(error = %e, "Contact log append failed"),
    }

    if let Ok(Value::Object(fields)) = serde_json::to_value(&form) {
        if let Err(e) = state.manager().intake_lead(fields).await {
            tracing::warn!(error = %e, "Recording contact lead failed");
        }
    }

    let team = Email {
        to: Recipient::Team,
        subject: format!("New enquiry from {}", form.name),
        text: form.summary(),
        reply_to: Some(form.email.clone()),
    };
    let confirmation = Email {
        to: Recipient::Address(form.email.clone()),
        subject: "Thanks for getting in touch".to_string(),
        text: format!(
            "Hi {},\n\nThanks for reaching out. We received your message and will reply within one business day.\n\n{}",
            form.name,
            form.summary()
        ),
        reply_to: None,
    };
    for email in [&team, &confirmation] {
        if let Err(e) = outbound.mailer.send(email).await {
            tracing::error!(error = %e, subject = %email.subject, "Contact email failed");
            return reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                false,
                "We could not send your message. Please try again or email us directly.",
            );
        }
    }

    tracing::info!("Contact submission delivered");
    reply(StatusCode::OK, true, "Thanks! We will be in touch shortly.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ContactRequest {
        ContactRequest {
            name: "  Ana  ".into(),
            email: " ana@example.com ".into(),
            phone: Some("   ".into()),
            company: Some(" Acme ".into()),
            service: None,
            budget: None,
            message: " Hello ".into(),
            token: " t ".into(),
        }
    }

    #[test]
    fn sanitize_trims_and_drops_blank_optionals() {
        let mut f = form();
        f.sanitize();
        assert_eq!(f.name, "Ana");
        assert_eq!(f.token, "t");
        assert_eq!(f.phone, None);
        assert_eq!(f.company.as_deref(), Some("Acme"));
        assert!(f.validate().is_ok());
    }

    #[test]
    fn token_is_not_serialized() {
        let mut f = form();
        f.sanitize();
        let v = serde_json::to_value(&f).unwrap();
        assert!(v.get("token").is_none());
        assert_eq!(v["company"], "Acme");
    }

    #[test]
    fn first_message_reports_a_field_message() {
        let mut f = form();
        f.sanitize();
        f.name = String::new();
        let errors = f.validate().unwrap_err();
        assert_eq!(first_message(&errors), "Please tell us your name.");
    }

    #[test]
    fn first_message_follows_form_order() {
        let mut f = form();
        f.sanitize();
        f.email = "not-an-address".into();
        f.message = String::new();
        let errors = f.validate().unwrap_err();
        assert_eq!(first_message(&errors), "Please enter a valid email address.");

        f.name = String::new();
        let errors = f.validate().unwrap_err();
        assert_eq!(first_message(&errors), "Please tell us your name.");
    }

    #[test]
    fn remote_ip_prefers_edge_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.0.0.1, 10.0.0.2".parse().unwrap());
        assert_eq!(remote_ip(&headers), Some("10.0.0.1"));
        headers.insert("cf-connecting-ip", "203.0.113.9".parse().unwrap());
        assert_eq!(remote_ip(&headers), Some("203.0.113.9"));
    }
}
