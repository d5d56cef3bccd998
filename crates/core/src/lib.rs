//! Crewboard domain core.
//!
//! Pure business rules for project governance with no I/O: the access
//! policy, membership and issue transition guards, lifecycle calendar
//! arithmetic, and the storage gateway contract the service layer drives.

pub mod access;
pub mod error;
pub mod issue;
pub mod lifecycle;
pub mod membership;
pub mod models;
pub mod status;
pub mod store;
pub mod types;
