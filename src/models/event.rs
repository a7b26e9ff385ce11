//! Event model (game nights and other gatherings)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Event record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub date_time: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub max_participants: i32,
    pub current_participants: i32,
    pub featured_game_id: i32,
    pub host_id: i32,
    /// Copy brought to the event
    pub game_instance_id: Option<i32>,
}

impl Event {
    pub fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.date_time <= now
    }
}

/// Create event request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEvent {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    pub date_time: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "max_participants must be at least 1"))]
    pub max_participants: i32,
    pub featured_game_id: i32,
    pub game_instance_id: Option<i32>,
}

/// Update event request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateEvent {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    pub date_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "max_participants must be at least 1"))]
    pub max_participants: Option<i32>,
    pub featured_game_id: Option<i32>,
    pub game_instance_id: Option<i32>,
    /// Detach the brought copy; cannot be combined with `game_instance_id`
    #[serde(default)]
    pub clear_game_instance: bool,
}

impl UpdateEvent {
    /// Copy the event points at once this update is applied
    pub fn instance_after(&self, current: Option<i32>) -> Option<i32> {
        if self.clear_game_instance {
            None
        } else {
            self.game_instance_id.or(current)
        }
    }
}

/// Query parameters for events
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EventQuery {
    /// Events on or after this instant
    pub from: Option<DateTime<Utc>>,
    /// Events on or before this instant
    pub to: Option<DateTime<Utc>>,
    pub game_id: Option<i32>,
    pub host_id: Option<i32>,
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Page number (0-based)
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(current: i32, max: i32) -> Event {
        Event {
            id: Uuid::new_v4(),
            title: "Game night".to_string(),
            date_time: Utc::now() + Duration::days(2),
            location: None,
            description: None,
            max_participants: max,
            current_participants: current,
            featured_game_id: 1,
            host_id: 1,
            game_instance_id: None,
        }
    }

    #[test]
    fn test_capacity() {
        assert!(!event(3, 4).is_full());
        assert!(event(4, 4).is_full());
    }

    #[test]
    fn test_has_started() {
        let e = event(0, 4);
        assert!(!e.has_started(Utc::now()));
        assert!(e.has_started(e.date_time + Duration::minutes(1)));
    }

    #[test]
    fn test_create_event_validation() {
        let request = CreateEvent {
            title: String::new(),
            date_time: Utc::now(),
            location: None,
            description: None,
            max_participants: 0,
            featured_game_id: 1,
            game_instance_id: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
        assert!(errors.field_errors().contains_key("max_participants"));
    }

    #[test]
    fn test_update_instance_after() {
        let update: UpdateEvent = serde_json::from_str(r#"{"title": "Renamed"}"#).unwrap();
        assert!(!update.clear_game_instance);
        assert_eq!(update.instance_after(Some(7)), Some(7));
        assert_eq!(update.instance_after(None), None);

        let update: UpdateEvent = serde_json::from_str(r#"{"game_instance_id": 9}"#).unwrap();
        assert_eq!(update.instance_after(Some(7)), Some(9));

        let update: UpdateEvent = serde_json::from_str(r#"{"clear_game_instance": true}"#).unwrap();
        assert_eq!(update.instance_after(Some(7)), None);
    }
}
