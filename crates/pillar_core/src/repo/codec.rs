//! Column encoders/decoders shared by the SQLite repositories.

use super::{RepoError, RepoResult};
use chrono::NaiveDate;
use uuid::Uuid;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<Uuid>> {
    value.map(|value| parse_uuid(&value, column)).transpose()
}

pub(crate) fn parse_date(value: &str, column: &'static str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

pub(crate) fn parse_optional_date(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<NaiveDate>> {
    value.map(|value| parse_date(&value, column)).transpose()
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// Builds `?, ?, ?` for an `IN (...)` clause.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
