//! Event registration model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Registration of an account to an event, joined with display names
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Registration {
    pub id: i32,
    pub registration_date: DateTime<Utc>,
    pub attendee_id: i32,
    pub attendee_name: String,
    pub event_id: Uuid,
    pub event_title: String,
    pub event_date_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRegistration {
    pub event_id: Uuid,
}

/// Move a registration to another event
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRegistration {
    pub event_id: Uuid,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RegistrationQuery {
    pub attendee_id: Option<i32>,
    pub event_id: Option<Uuid>,
    /// Page number (0-based)
    pub page: Option<i64>,
    pub size: Option<i64>,
}
