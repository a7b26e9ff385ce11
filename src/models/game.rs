//! Game catalog and game instance models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Game (catalog entry)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Game {
    pub id: i32,
    pub name: String,
    pub min_players: i32,
    pub max_players: i32,
    pub image: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub date_added: DateTime<Utc>,
    pub owner_id: i32,
}

/// One physical, lendable copy of a game
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct GameInstance {
    pub id: i32,
    pub game_id: i32,
    pub owner_id: i32,
    /// Free-form condition ("new", "good", "worn", ...)
    pub condition: String,
    pub available: bool,
    pub location: Option<String>,
    pub name: Option<String>,
    pub acquired_date: DateTime<Utc>,
}

fn validate_player_range(min: i32, max: i32) -> Result<(), ValidationError> {
    if min < 1 || min > max {
        let mut err = ValidationError::new("player_range");
        err.message = Some("min_players must be at least 1 and not exceed max_players".into());
        return Err(err);
    }
    Ok(())
}

fn validate_create_game(game: &CreateGame) -> Result<(), ValidationError> {
    validate_player_range(game.min_players, game.max_players)
}

/// Create game request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_game"))]
pub struct CreateGame {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    pub min_players: i32,
    pub max_players: i32,
    pub image: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// Update game request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateGame {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    pub min_players: Option<i32>,
    pub max_players: Option<i32>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl UpdateGame {
    /// Check the resulting player range once merged with the stored game
    pub fn check_player_range(&self, current: &Game) -> Result<(), ValidationError> {
        validate_player_range(
            self.min_players.unwrap_or(current.min_players),
            self.max_players.unwrap_or(current.max_players),
        )
    }
}

/// Game search parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct GameQuery {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    pub category: Option<String>,
    /// Only games playable with this number of players
    pub players: Option<i32>,
    pub owner_id: Option<i32>,
    /// Page number (0-based)
    pub page: Option<i64>,
    pub size: Option<i64>,
}

/// Create game instance request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGameInstance {
    #[validate(length(min = 1, max = 50, message = "Condition must be 1-50 characters"))]
    pub condition: String,
    pub available: Option<bool>,
    pub location: Option<String>,
    pub name: Option<String>,
    pub acquired_date: Option<DateTime<Utc>>,
}

/// Update game instance request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateGameInstance {
    #[validate(length(min = 1, max = 50, message = "Condition must be 1-50 characters"))]
    pub condition: Option<String>,
    pub available: Option<bool>,
    pub location: Option<String>,
    pub name: Option<String>,
}

/// Availability check parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AvailabilityQuery {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub instance_id: Option<i32>,
}

/// Availability check result
#[derive(Debug, Serialize, ToSchema)]
pub struct Availability {
    pub game_id: i32,
    pub instance_id: Option<i32>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub available: bool,
    /// Ids of approved requests overlapping the range
    pub conflicting_requests: Vec<i32>,
}

/// Average rating of a game
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct GameRating {
    pub game_id: i32,
    pub average: Option<f64>,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(min: i32, max: i32) -> CreateGame {
        CreateGame {
            name: "Catan".to_string(),
            min_players: min,
            max_players: max,
            image: None,
            category: Some("strategy".to_string()),
            description: None,
        }
    }

    #[test]
    fn test_player_range() {
        assert!(create(3, 4).validate().is_ok());
        assert!(create(2, 2).validate().is_ok());
        assert!(create(5, 4).validate().is_err());
        assert!(create(0, 4).validate().is_err());
    }

    #[test]
    fn test_update_player_range_merges_current() {
        let current = Game {
            id: 1,
            name: "Catan".to_string(),
            min_players: 3,
            max_players: 4,
            image: None,
            category: None,
            description: None,
            date_added: Utc::now(),
            owner_id: 1,
        };
        let update = UpdateGame {
            name: None,
            min_players: Some(5),
            max_players: None,
            image: None,
            category: None,
            description: None,
        };
        assert!(update.check_player_range(&current).is_err());

        let update = UpdateGame { max_players: Some(6), ..update };
        assert!(update.check_player_range(&current).is_ok());
    }
}
