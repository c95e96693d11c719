//! Counselor roster and meeting requests
//!
//! Students pick a counselor, a date, a slot and a meeting type; the request
//! is relayed to the student by email through a [`Mailer`].

use crate::types::{AppError, Claims, FieldError, Result};
use crate::utils::toml_config::MailConfig;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Counselor {
    pub id: u32,
    pub name: &'static str,
    pub specialty: &'static str,
}

pub const COUNSELORS: &[Counselor] = &[
    Counselor {
        id: 1,
        name: "Dr. Sarah Johnson",
        specialty: "Career Development & Planning",
    },
    Counselor {
        id: 2,
        name: "Dr. Michael Chen",
        specialty: "Professional Growth Strategy",
    },
    Counselor {
        id: 3,
        name: "Dr. Emily Williams",
        specialty: "Resume Building & Interview Prep",
    },
    Counselor {
        id: 4,
        name: "Dr. James Wilson",
        specialty: "Industry Transition Guidance",
    },
    Counselor {
        id: 5,
        name: "Dr. Lisa Rodriguez",
        specialty: "Leadership Development",
    },
];

pub const TIME_SLOTS: &[&str] = &[
    "09:00 AM", "10:00 AM", "11:00 AM", "02:00 PM", "03:00 PM", "04:00 PM",
];

pub fn find_counselor(name: &str) -> Option<&'static Counselor> {
    COUNSELORS.iter().find(|c| c.name == name)
}

/// Body of `GET /api/counselors`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounselorDirectory {
    pub counselors: &'static [Counselor],
    pub time_slots: &'static [&'static str],
}

impl CounselorDirectory {
    pub fn current() -> Self {
        Self {
            counselors: COUNSELORS,
            time_slots: TIME_SLOTS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MeetingType {
    #[default]
    Video,
    Chat,
}

impl MeetingType {
    pub fn label(&self) -> &'static str {
        match self {
            MeetingType::Video => "Video Call",
            MeetingType::Chat => "Chat Session",
        }
    }
}

/// Body of `POST /api/email`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MeetingRequest {
    pub email: String,
    pub counselor_name: String,
    pub date: String,
    pub time: String,
    pub meeting_type: MeetingType,
}

impl MeetingRequest {
    /// Fill a blank `email` from the session.
    pub fn with_session_email(mut self, claims: &Claims) -> Self {
        if self.email.trim().is_empty() {
            self.email = claims.email.clone();
        }
        self
    }

    pub fn validate(&self) -> std::result::Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.email.trim().is_empty() || !self.email.contains('@') {
            errors.push(FieldError::new("email", "A valid email address is required"));
        }
        if find_counselor(&self.counselor_name).is_none() {
            errors.push(FieldError::new("counselorName", "Please select a counselor"));
        }
        if NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").is_err() {
            errors.push(FieldError::new("date", "Please select a date"));
        }
        if !TIME_SLOTS.contains(&self.time.as_str()) {
            errors.push(FieldError::new("time", "Please select a time slot"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A rendered message ready for the mail provider.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

const CONFIRMATION_TEMPLATE: &str = "meeting_confirmation";

const CONFIRMATION_HTML: &str = "<h2>Your counseling session is scheduled</h2>\
<p>Counselor: <strong>{{counselor}}</strong></p>\
<p>Date: {{date}}</p>\
<p>Time: {{time}}</p>\
<p>Meeting type: {{meeting_type}}</p>";

/// Render the confirmation sent to the student. Values are HTML-escaped.
pub fn render_confirmation(from: &str, request: &MeetingRequest) -> Result<OutgoingEmail> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars
        .register_template_string(CONFIRMATION_TEMPLATE, CONFIRMATION_HTML)
        .map_err(|e| AppError::Internal(format!("Invalid email template: {}", e)))?;

    let html = handlebars
        .render(
            CONFIRMATION_TEMPLATE,
            &json!({
                "counselor": request.counselor_name,
                "date": request.date.trim(),
                "time": request.time,
                "meeting_type": request.meeting_type.label(),
            }),
        )
        .map_err(|e| AppError::Internal(format!("Email render error: {}", e)))?;

    Ok(OutgoingEmail {
        from: from.to_string(),
        to: vec![request.email.trim().to_string()],
        subject: format!("Meeting scheduled with {}", request.counselor_name),
        html,
    })
}

/// Outbound email delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// Mail provider with a JSON `POST` API and bearer authentication.
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn from_config(config: &MailConfig, api_key: Option<String>) -> Self {
        Self::new(config.api_url.clone(), api_key)
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Mail("Mail provider is not configured".to_string()))?;

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(email)
            .send()
            .await
            .map_err(|e| AppError::Mail(format!("Mail request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Mail(format!(
                "Mail provider returned {}: {}",
                status, text
            )));
        }

        Ok(())
    }
}

/// Validate, render and send a meeting confirmation from `from`.
pub async fn schedule_meeting(
    mailer: &dyn Mailer,
    from: &str,
    claims: &Claims,
    request: MeetingRequest,
) -> Result<()> {
    let request = request.with_session_email(claims);
    request.validate().map_err(AppError::Validation)?;

    let email = render_confirmation(from, &request)?;
    mailer.send(&email).await.map_err(|e| {
        tracing::error!(counselor = %request.counselor_name, "Failed to send meeting email: {}", e);
        AppError::Mail("Failed to schedule meeting".to_string())
    })?;

    tracing::info!(
        counselor = %request.counselor_name,
        date = %request.date,
        time = %request.time,
        "Meeting scheduled"
    );
    Ok(())
}
