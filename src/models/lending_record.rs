//! Lending record model and its status state machine
//!
//! A record moves strictly forward through
//! `ACTIVE -> OVERDUE -> PENDING_RETURN -> CLOSED`, skipping steps when the
//! triggering event allows it. `CLOSED` is terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::text_enum_sqlx;

const MS_PER_DAY: i64 = 86_400_000;
pub const MAX_DAMAGE_SEVERITY: i16 = 3;

/// Lending record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LendingStatus {
    /// Game is with the borrower
    Active,
    /// Owner flagged the record as late
    Overdue,
    /// Borrower reported the game returned, owner has not confirmed yet
    PendingReturn,
    Closed,
}

/// What is asking the record to change status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LendingEvent {
    BorrowerReturned,
    OwnerConfirmedReturn,
    OwnerSetStatus(LendingStatus),
}

impl LendingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LendingStatus::Active => "ACTIVE",
            LendingStatus::Overdue => "OVERDUE",
            LendingStatus::PendingReturn => "PENDING_RETURN",
            LendingStatus::Closed => "CLOSED",
        }
    }

    /// Position in the lifecycle; transitions only ever increase it
    pub fn rank(&self) -> u8 {
        match self {
            LendingStatus::Active => 0,
            LendingStatus::Overdue => 1,
            LendingStatus::PendingReturn => 2,
            LendingStatus::Closed => 3,
        }
    }

    pub fn is_open(&self) -> bool {
        *self != LendingStatus::Closed
    }

    /// Compute the next status for `event`, or explain why it is not allowed
    pub fn apply(self, event: LendingEvent) -> Result<LendingStatus, String> {
        if self == LendingStatus::Closed {
            return Err("Lending record is already closed".to_string());
        }

        let next = match event {
            LendingEvent::BorrowerReturned => match self {
                LendingStatus::Active | LendingStatus::Overdue => LendingStatus::PendingReturn,
                _ => return Err("Return has already been reported".to_string()),
            },
            LendingEvent::OwnerConfirmedReturn => LendingStatus::Closed,
            LendingEvent::OwnerSetStatus(target) => match (self, target) {
                (LendingStatus::Active, LendingStatus::Overdue) => LendingStatus::Overdue,
                (_, LendingStatus::Closed) => LendingStatus::Closed,
                (from, to) => {
                    return Err(format!("Cannot change status from {} to {}", from, to));
                }
            },
        };

        debug_assert!(next.rank() > self.rank());
        Ok(next)
    }
}

impl std::fmt::Display for LendingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LendingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(LendingStatus::Active),
            "OVERDUE" => Ok(LendingStatus::Overdue),
            "PENDING_RETURN" => Ok(LendingStatus::PendingReturn),
            "CLOSED" => Ok(LendingStatus::Closed),
            _ => Err(format!("Invalid lending status: {}", s)),
        }
    }
}

text_enum_sqlx!(LendingStatus);

/// Whole days between two instants, truncated
pub fn duration_in_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_milliseconds() / MS_PER_DAY
}

/// Late and still marked ACTIVE, or explicitly flagged OVERDUE
pub fn is_overdue(status: LendingStatus, end_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match status {
        LendingStatus::Overdue => true,
        LendingStatus::Active => end_date < now,
        _ => false,
    }
}

pub fn clamp_severity(severity: i32) -> i16 {
    severity.clamp(0, MAX_DAMAGE_SEVERITY as i32) as i16
}

/// Lending record joined with game and people names
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LendingRecord {
    pub id: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: LendingStatus,
    pub record_owner_id: i32,
    pub record_owner_name: String,
    pub borrower_id: i32,
    pub borrower_name: String,
    pub request_id: i32,
    pub game_id: i32,
    pub game_name: String,
    pub instance_id: Option<i32>,
    pub is_damaged: bool,
    pub damage_notes: Option<String>,
    /// 0 (none) to 3 (severe)
    pub damage_severity: i16,
    pub damage_assessment_date: Option<DateTime<Utc>>,
    pub last_modified_date: DateTime<Utc>,
    pub last_modified_by: Option<i32>,
    pub status_change_reason: Option<String>,
    pub closed_by: Option<i32>,
    pub closing_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Computed on read
    #[sqlx(skip)]
    pub duration_in_days: i64,
    /// Computed on read
    #[sqlx(skip)]
    pub is_overdue: bool,
}

impl LendingRecord {
    /// Fill the fields derived from dates
    pub fn with_derived(mut self, now: DateTime<Utc>) -> Self {
        self.duration_in_days = duration_in_days(self.start_date, self.end_date);
        self.is_overdue = is_overdue(self.status, self.end_date, now);
        self
    }
}

/// Damage assessment recorded when the owner confirms a return
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageAssessment {
    pub is_damaged: bool,
    pub notes: Option<String>,
    pub severity: i16,
}

impl DamageAssessment {
    pub fn new(is_damaged: bool, notes: Option<String>, severity: Option<i32>) -> Self {
        if !is_damaged {
            return Self {
                is_damaged: false,
                notes: None,
                severity: 0,
            };
        }
        Self {
            is_damaged: true,
            notes,
            severity: clamp_severity(severity.unwrap_or(1)),
        }
    }
}

/// Create a record for an approved borrow request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLendingRecord {
    pub request_id: i32,
}

/// Manual status change by the owner
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLendingStatus {
    /// OVERDUE or CLOSED
    pub status: String,
    pub reason: String,
}

/// Owner confirmation of a return
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmReturn {
    #[serde(default)]
    pub is_damaged: bool,
    pub damage_notes: Option<String>,
    /// Clamped to 0..=3
    pub damage_severity: Option<i32>,
    pub closing_reason: Option<String>,
}

/// Move the end date of an open record
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtendEndDate {
    pub end_date: DateTime<Utc>,
    pub reason: String,
}

/// Columns a listing may be sorted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LendingSortField {
    Id,
    StartDate,
    EndDate,
    Status,
}

impl LendingSortField {
    pub fn column(&self) -> &'static str {
        match self {
            LendingSortField::Id => "lr.id",
            LendingSortField::StartDate => "lr.start_date",
            LendingSortField::EndDate => "lr.end_date",
            LendingSortField::Status => "lr.status",
        }
    }
}

impl std::str::FromStr for LendingSortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(LendingSortField::Id),
            "startDate" | "start_date" => Ok(LendingSortField::StartDate),
            "endDate" | "end_date" => Ok(LendingSortField::EndDate),
            "status" => Ok(LendingSortField::Status),
            _ => Err(format!("Invalid sort field: {}", s)),
        }
    }
}

/// Lending record filters, pagination and sorting
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct LendingRecordQuery {
    pub status: Option<String>,
    pub owner_id: Option<i32>,
    pub borrower_id: Option<i32>,
    pub game_id: Option<i32>,
    /// Records ending on or after this instant
    pub from_date: Option<DateTime<Utc>>,
    /// Records starting on or before this instant
    pub to_date: Option<DateTime<Utc>>,
    /// Only records past their end date and still ACTIVE
    pub overdue_only: Option<bool>,
    /// Page number (0-based)
    pub page: Option<i64>,
    pub size: Option<i64>,
    /// id, startDate, endDate or status
    pub sort: Option<String>,
    /// asc or desc
    pub direction: Option<String>,
}

impl LendingRecordQuery {
    /// Parse `sort`/`direction` into a whitelisted ORDER BY clause
    pub fn order_by(&self) -> Result<String, String> {
        let field = match self.sort.as_deref() {
            Some(s) => s.parse::<LendingSortField>()?,
            None => LendingSortField::Id,
        };
        let direction = match self.direction.as_deref().map(str::to_lowercase).as_deref() {
            None | Some("asc") => "ASC",
            Some("desc") => "DESC",
            Some(other) => return Err(format!("Invalid sort direction: {}", other)),
        };
        if field == LendingSortField::Id {
            return Ok(format!("lr.id {}", direction));
        }
        Ok(format!("{} {}, lr.id {}", field.column(), direction, direction))
    }
}

/// Owner dashboard statistics
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct LendingStats {
    pub total: i64,
    pub active: i64,
    pub overdue: i64,
    pub pending_return: i64,
    pub closed: i64,
    /// ACTIVE records past their end date
    pub overdue_now: i64,
    pub damaged: i64,
    pub average_duration_days: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use LendingEvent::*;
    use LendingStatus::*;

    const ALL: [LendingStatus; 4] = [Active, Overdue, PendingReturn, Closed];

    #[test]
    fn test_borrower_return() {
        assert_eq!(Active.apply(BorrowerReturned), Ok(PendingReturn));
        assert_eq!(Overdue.apply(BorrowerReturned), Ok(PendingReturn));
        assert!(PendingReturn.apply(BorrowerReturned).is_err());
        assert!(Closed.apply(BorrowerReturned).is_err());
    }

    #[test]
    fn test_owner_confirmation_closes() {
        for status in [Active, Overdue, PendingReturn] {
            assert_eq!(status.apply(OwnerConfirmedReturn), Ok(Closed));
        }
    }

    #[test]
    fn test_closed_cannot_reopen() {
        for target in ALL {
            assert!(Closed.apply(OwnerSetStatus(target)).is_err());
        }
        assert!(Closed.apply(OwnerConfirmedReturn).is_err());
    }

    #[test]
    fn test_manual_updates() {
        assert_eq!(Active.apply(OwnerSetStatus(Overdue)), Ok(Overdue));
        assert_eq!(Active.apply(OwnerSetStatus(Closed)), Ok(Closed));
        assert_eq!(Overdue.apply(OwnerSetStatus(Closed)), Ok(Closed));
        assert!(Overdue.apply(OwnerSetStatus(Active)).is_err());
        assert!(Active.apply(OwnerSetStatus(Active)).is_err());
        assert!(Active.apply(OwnerSetStatus(PendingReturn)).is_err());
        assert!(PendingReturn.apply(OwnerSetStatus(Overdue)).is_err());
    }

    #[test]
    fn test_transitions_are_monotonic() {
        let events = [
            BorrowerReturned,
            OwnerConfirmedReturn,
            OwnerSetStatus(Active),
            OwnerSetStatus(Overdue),
            OwnerSetStatus(PendingReturn),
            OwnerSetStatus(Closed),
        ];
        for from in ALL {
            for event in events {
                if let Ok(to) = from.apply(event) {
                    assert!(to.rank() > from.rank(), "{:?} -> {:?}", from, to);
                }
            }
        }
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<LendingStatus>(), Ok(status));
        }
        assert_eq!("pending_return".parse::<LendingStatus>(), Ok(PendingReturn));
        assert!("RETURNED".parse::<LendingStatus>().is_err());
    }

    #[test]
    fn test_duration_in_days() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        for n in [0, 1, 7, 30, 365] {
            assert_eq!(duration_in_days(start, start + Duration::days(n)), n);
        }
        // truncation
        assert_eq!(duration_in_days(start, start + Duration::hours(47)), 1);
    }

    #[test]
    fn test_overdue_detection() {
        let now = Utc::now();
        let past = now - Duration::days(1);
        let future = now + Duration::days(1);
        assert!(is_overdue(Active, past, now));
        assert!(!is_overdue(Active, future, now));
        assert!(is_overdue(Overdue, future, now));
        assert!(!is_overdue(PendingReturn, past, now));
        assert!(!is_overdue(Closed, past, now));
    }

    #[test]
    fn test_damage_assessment() {
        assert_eq!(
            DamageAssessment::new(false, Some("ignored".into()), Some(3)),
            DamageAssessment { is_damaged: false, notes: None, severity: 0 }
        );
        assert_eq!(DamageAssessment::new(true, None, Some(9)).severity, 3);
        assert_eq!(DamageAssessment::new(true, None, Some(-2)).severity, 0);
        assert_eq!(DamageAssessment::new(true, None, None).severity, 1);
    }

    #[test]
    fn test_order_by() {
        let query = LendingRecordQuery::default();
        assert_eq!(query.order_by().unwrap(), "lr.id ASC");

        let query = LendingRecordQuery {
            sort: Some("id".to_string()),
            direction: Some("desc".to_string()),
            ..Default::default()
        };
        assert_eq!(query.order_by().unwrap(), "lr.id DESC");

        let query = LendingRecordQuery {
            sort: Some("endDate".to_string()),
            direction: Some("DESC".to_string()),
            ..Default::default()
        };
        assert_eq!(query.order_by().unwrap(), "lr.end_date DESC, lr.id DESC");

        let query = LendingRecordQuery {
            sort: Some("end_date; DROP TABLE".to_string()),
            ..Default::default()
        };
        assert!(query.order_by().is_err());
    }
}
