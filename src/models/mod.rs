//! Data models for GameLend

/// Implements sqlx TEXT encoding for enums exposing `as_str()` and `FromStr<Err = String>`
macro_rules! text_enum_sqlx {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s: String = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

pub(crate) use text_enum_sqlx;

pub mod account;
pub mod borrow_request;
pub mod event;
pub mod game;
pub mod lending_record;
pub mod registration;
pub mod review;

// Re-export commonly used types
pub use account::{Account, AccountClaims};
pub use borrow_request::{BorrowRequest, BorrowRequestStatus};
pub use event::Event;
pub use game::{Game, GameInstance};
pub use lending_record::{LendingRecord, LendingStatus};
pub use registration::Registration;
pub use review::Review;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Resolve `page` (0-based) and `size` query values into `(page, size, offset)`
pub fn page_bounds(page: Option<i64>, size: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(0).max(0);
    let size = size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, size, page.saturating_mul(size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds_defaults() {
        assert_eq!(page_bounds(None, None), (0, DEFAULT_PAGE_SIZE, 0));
    }

    #[test]
    fn test_page_bounds_clamps() {
        assert_eq!(page_bounds(Some(-3), Some(0)), (0, 1, 0));
        assert_eq!(page_bounds(Some(2), Some(500)), (2, MAX_PAGE_SIZE, 200));
        assert_eq!(page_bounds(Some(3), Some(10)), (3, 10, 30));
    }

    #[test]
    fn test_page_bounds_huge_page() {
        let (page, size, offset) = page_bounds(Some(i64::MAX), Some(20));
        assert_eq!(page, i64::MAX);
        assert_eq!(size, 20);
        assert_eq!(offset, i64::MAX);
    }
}
