//! Crewboard use cases.
//!
//! Each service is generic over a [`Store`](crewboard_core::store::Store)
//! and runs every operation inside one gateway transaction: load snapshots,
//! apply the pure guards from `crewboard_core`, write, commit. A guard
//! failure returns before any write and the dropped transaction rolls back.
//!
//! - [`AccessService`]: standalone policy checks.
//! - [`MembershipService`]: invitations, role changes, removals.
//! - [`IssueService`]: issue creation, assignment and status.
//! - [`ProjectService`]: project creation, completion, delete and restore.
//! - [`MemoryStore`]: an in-process gateway for tests and local runs.

pub mod access;
pub mod issues;
pub mod membership;
pub mod memory;
pub mod projects;

mod support;

pub use access::AccessService;
pub use issues::IssueService;
pub use membership::MembershipService;
pub use memory::MemoryStore;
pub use projects::ProjectService;
