//! Row structs.
//!
//! Each submodule contains a `FromRow` struct matching the database row and
//! an `into_domain` conversion into the matching `crewboard_core` snapshot.
//! Text status columns are parsed on the way out; a value outside the
//! `CHECK` constraint surfaces as a decode error.

pub mod issue;
pub mod member;
pub mod notification;
pub mod project;
pub mod user;

use crewboard_core::error::CoreError;

/// Parse a text status column, reporting failures as a decode error.
pub(crate) fn decode<T>(raw: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr<Err = CoreError>,
{
    raw.parse::<T>().map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
