/*
 * Responsibility
 * - Request / response DTOs for v1
 * - Shape checks beyond the body schema (dates) live next to the DTO
 */
pub mod devices;
pub mod profiles;
pub mod shares;
pub mod subscription;
pub mod vaccines;

use chrono::NaiveDate;

use crate::error::{AppError, FieldError};

/// `YYYY-MM-DD`, reported against `field` when it does not parse.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::Validation(vec![FieldError::new(field, "must be a date (YYYY-MM-DD)")])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_are_iso_calendar_days() {
        assert_eq!(
            parse_date("birthDate", "2019-02-28").unwrap(),
            NaiveDate::from_ymd_opt(2019, 2, 28).unwrap()
        );
        match parse_date("birthDate", "2019-02-30") {
            Err(AppError::Validation(fields)) => assert_eq!(fields[0].field, "birthDate"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
