//! Borrow request model and date-range conflict rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::text_enum_sqlx;

/// Borrow request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BorrowRequestStatus {
    Pending,
    Approved,
    Declined,
}

impl BorrowRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowRequestStatus::Pending => "PENDING",
            BorrowRequestStatus::Approved => "APPROVED",
            BorrowRequestStatus::Declined => "DECLINED",
        }
    }

    /// APPROVED and DECLINED cannot be left
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BorrowRequestStatus::Pending)
    }

    pub fn can_transition_to(&self, next: BorrowRequestStatus) -> bool {
        matches!(
            (self, next),
            (BorrowRequestStatus::Pending, BorrowRequestStatus::Approved)
                | (BorrowRequestStatus::Pending, BorrowRequestStatus::Declined)
        )
    }
}

impl std::fmt::Display for BorrowRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(BorrowRequestStatus::Pending),
            "APPROVED" => Ok(BorrowRequestStatus::Approved),
            "DECLINED" => Ok(BorrowRequestStatus::Declined),
            _ => Err(format!("Invalid borrow request status: {}", s)),
        }
    }
}

text_enum_sqlx!(BorrowRequestStatus);

/// Borrow request from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequest {
    pub id: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: BorrowRequestStatus,
    pub request_date: DateTime<Utc>,
    pub game_id: i32,
    pub instance_id: Option<i32>,
    pub requester_id: i32,
    pub responder_id: Option<i32>,
}

/// Borrow request joined with game and people, for listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequestDetails {
    pub id: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: BorrowRequestStatus,
    pub request_date: DateTime<Utc>,
    pub game_id: i32,
    pub game_name: String,
    pub game_owner_id: i32,
    pub instance_id: Option<i32>,
    pub requester_id: i32,
    pub requester_name: String,
    pub responder_id: Option<i32>,
    /// Lending record created on approval
    pub lending_record_id: Option<i32>,
}

/// Create borrow request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBorrowRequest {
    pub game_id: i32,
    pub instance_id: Option<i32>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Status update body. The status is kept as a string so that unknown values
/// surface as a 400 with a readable message.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBorrowRequestStatus {
    /// APPROVED or DECLINED
    pub status: String,
}

/// Borrow request filters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BorrowRequestQuery {
    pub status: Option<String>,
    pub requester_id: Option<i32>,
    /// Owner of the requested game
    pub owner_id: Option<i32>,
    pub game_id: Option<i32>,
    /// Page number (0-based)
    pub page: Option<i64>,
    pub size: Option<i64>,
}

/// Half-open interval overlap: `[start, end)` against `[other_start, other_end)`
pub fn ranges_overlap(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    other_start: DateTime<Utc>,
    other_end: DateTime<Utc>,
) -> bool {
    start < other_end && end > other_start
}

/// Validate the requested date range
pub fn check_date_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), String> {
    if end <= start {
        return Err("End date must be after start date".to_string());
    }
    Ok(())
}

/// Whether an existing request competes for the same copy as the target.
///
/// A target naming an instance competes with requests on that instance and
/// with game-level requests (no instance) of the same game. A game-level
/// target competes with every request on the game.
pub fn same_target(
    game_id: i32,
    instance_id: Option<i32>,
    other_game_id: i32,
    other_instance_id: Option<i32>,
) -> bool {
    if game_id != other_game_id {
        return false;
    }
    match (instance_id, other_instance_id) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

impl BorrowRequest {
    /// True when `other` is an approved request blocking this one
    pub fn conflicts_with(&self, other: &BorrowRequest) -> bool {
        other.id != self.id
            && other.status == BorrowRequestStatus::Approved
            && same_target(self.game_id, self.instance_id, other.game_id, other.instance_id)
            && ranges_overlap(self.start_date, self.end_date, other.start_date, other.end_date)
    }

    /// Same request ending at `end_date`
    pub fn extended_to(&self, end_date: DateTime<Utc>) -> Self {
        Self {
            end_date,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, 0, 0, 0).unwrap()
    }

    fn request(id: i32, instance: Option<i32>, start: u32, end: u32, status: BorrowRequestStatus) -> BorrowRequest {
        BorrowRequest {
            id,
            start_date: day(start),
            end_date: day(end),
            status,
            request_date: day(1),
            game_id: 1,
            instance_id: instance,
            requester_id: 2,
            responder_id: None,
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("approved".parse::<BorrowRequestStatus>(), Ok(BorrowRequestStatus::Approved));
        assert_eq!(" DECLINED ".parse::<BorrowRequestStatus>(), Ok(BorrowRequestStatus::Declined));
        assert!("ACCEPTED".parse::<BorrowRequestStatus>().is_err());
    }

    #[test]
    fn test_status_transitions() {
        use BorrowRequestStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Declined));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Declined));
        assert!(!Declined.can_transition_to(Approved));
        assert!(Approved.is_terminal() && Declined.is_terminal());
    }

    #[test]
    fn test_half_open_overlap() {
        // touching ranges do not overlap
        assert!(!ranges_overlap(day(1), day(5), day(5), day(8)));
        assert!(!ranges_overlap(day(5), day(8), day(1), day(5)));
        assert!(ranges_overlap(day(1), day(6), day(5), day(8)));
        assert!(ranges_overlap(day(2), day(3), day(1), day(8)));
        assert!(ranges_overlap(day(1), day(8), day(2), day(3)));
    }

    #[test]
    fn test_date_range_check() {
        assert!(check_date_range(day(1), day(2)).is_ok());
        assert!(check_date_range(day(2), day(2)).is_err());
        assert!(check_date_range(day(3), day(2)).is_err());
        assert!(check_date_range(day(1), day(1) + Duration::seconds(1)).is_ok());
    }

    #[test]
    fn test_conflicts_only_with_approved() {
        let target = request(1, None, 3, 6, BorrowRequestStatus::Pending);
        assert!(target.conflicts_with(&request(2, None, 5, 9, BorrowRequestStatus::Approved)));
        assert!(!target.conflicts_with(&request(3, None, 5, 9, BorrowRequestStatus::Pending)));
        assert!(!target.conflicts_with(&request(4, None, 5, 9, BorrowRequestStatus::Declined)));
        assert!(!target.conflicts_with(&request(5, None, 6, 9, BorrowRequestStatus::Approved)));
    }

    #[test]
    fn test_instance_scoping() {
        let on_copy_a = request(1, Some(10), 3, 6, BorrowRequestStatus::Pending);
        assert!(!on_copy_a.conflicts_with(&request(2, Some(11), 3, 6, BorrowRequestStatus::Approved)));
        assert!(on_copy_a.conflicts_with(&request(3, Some(10), 3, 6, BorrowRequestStatus::Approved)));
        assert!(on_copy_a.conflicts_with(&request(4, None, 3, 6, BorrowRequestStatus::Approved)));

        let game_level = request(5, None, 3, 6, BorrowRequestStatus::Pending);
        assert!(game_level.conflicts_with(&request(6, Some(11), 4, 5, BorrowRequestStatus::Approved)));
    }

    #[test]
    fn test_extension_into_next_lending_conflicts() {
        let first = request(1, None, 1, 8, BorrowRequestStatus::Approved);
        let next = request(2, None, 8, 10, BorrowRequestStatus::Approved);
        assert!(!first.conflicts_with(&next));

        assert!(first.extended_to(day(12)).conflicts_with(&next));
        assert!(!first.extended_to(day(8)).conflicts_with(&next));
        assert!(!first.extended_to(day(5)).conflicts_with(&next));
        assert_eq!(first.extended_to(day(12)).start_date, first.start_date);
    }

    #[test]
    fn test_request_never_conflicts_with_itself() {
        let approved = request(1, None, 3, 6, BorrowRequestStatus::Approved);
        assert!(!approved.conflicts_with(&approved.clone()));
    }
}
