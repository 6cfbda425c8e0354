//! Contact-form intake. Accepted messages are stamped with the configured sender and
//! agent addresses and handed to an inbox; delivery itself happens elsewhere.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::listings::request_context;
use crate::settings::{ConfigResolver, ResolveContext, SettingKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub message: String,
    #[serde(default)]
    pub listing_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactMessage {
    pub receipt_id: String,
    pub received_at: DateTime<Utc>,
    pub submission: ContactSubmission,
    pub sender_name: String,
    pub sender_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliver_to: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("inbox unavailable: {0}")]
    Inbox(String),
}

/// Destination for accepted contact messages.
pub trait ContactInbox: Send + Sync {
    fn deliver(&self, message: ContactMessage) -> Result<(), ContactError>;
}

pub const DEFAULT_INBOX_CAPACITY: usize = 500;

/// Most recent messages, oldest evicted first once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct MemoryContactInbox {
    capacity: usize,
    messages: Arc<Mutex<VecDeque<ContactMessage>>>,
}

impl Default for MemoryContactInbox {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_INBOX_CAPACITY)
    }
}

impl MemoryContactInbox {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            messages: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
        }
    }

    pub fn messages(&self) -> Vec<ContactMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl ContactInbox for MemoryContactInbox {
    fn deliver(&self, message: ContactMessage) -> Result<(), ContactError> {
        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        if messages.len() >= self.capacity {
            if let Some(evicted) = messages.pop_front() {
                warn!(receipt = %evicted.receipt_id, capacity = self.capacity, "contact inbox full, dropping oldest message");
            }
        }
        messages.push_back(message);
        Ok(())
    }
}

static RECEIPT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_receipt_id() -> String {
    let id = RECEIPT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("msg-{id:06}")
}

fn required(value: &str, field: &'static str) -> Result<(), ContactError> {
    if value.trim().is_empty() {
        Err(ContactError::Missing(field))
    } else {
        Ok(())
    }
}

fn validate(submission: &ContactSubmission) -> Result<(), ContactError> {
    required(&submission.name, "name")?;
    required(&submission.email, "email")?;
    required(&submission.message, "message")?;

    let email = submission.email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid {
        return Err(ContactError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

pub struct ContactService<I> {
    inbox: Arc<I>,
    resolver: Arc<ConfigResolver>,
}

impl<I> ContactService<I>
where
    I: ContactInbox + 'static,
{
    pub fn new(inbox: Arc<I>, resolver: Arc<ConfigResolver>) -> Self {
        Self { inbox, resolver }
    }

    pub async fn submit(
        &self,
        submission: ContactSubmission,
        ctx: &ResolveContext,
    ) -> Result<ContactMessage, ContactError> {
        validate(&submission)?;
        let snapshot = self.resolver.snapshot(ctx).await;

        let message = ContactMessage {
            receipt_id: next_receipt_id(),
            received_at: Utc::now(),
            submission,
            sender_name: snapshot.get(SettingKey::EmailSenderName).to_string(),
            sender_address: snapshot.get(SettingKey::EmailSenderAddress).to_string(),
            deliver_to: snapshot.value(SettingKey::AgentEmail).map(str::to_string),
        };

        self.inbox.deliver(message.clone())?;
        info!(receipt = %message.receipt_id, listing = ?message.submission.listing_id, "contact message accepted");
        Ok(message)
    }
}

pub fn contact_router<I>(service: Arc<ContactService<I>>) -> Router
where
    I: ContactInbox + 'static,
{
    Router::new()
        .route("/api/v1/contact", post(submit_handler::<I>))
        .with_state(service)
}

pub(crate) async fn submit_handler<I>(
    State(service): State<Arc<ContactService<I>>>,
    RawQuery(raw): RawQuery,
    Json(submission): Json<ContactSubmission>,
) -> Response
where
    I: ContactInbox + 'static,
{
    let ctx = request_context(raw.as_deref(), None);
    match service.submit(submission, &ctx).await {
        Ok(message) => {
            let payload = json!({
                "success": true,
                "receipt_id": message.receipt_id,
            });
            (StatusCode::ACCEPTED, Json(payload)).into_response()
        }
        Err(error @ (ContactError::Missing(_) | ContactError::InvalidEmail(_))) => {
            let payload = json!({ "success": false, "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({ "success": false, "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
