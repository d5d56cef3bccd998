#![allow(dead_code)]

use chrono::{NaiveDate, TimeZone, Utc};
use crewboard_core::models::CreateProject;
use crewboard_core::status::{MemberRole, MemberStatus, ProjectStatus};
use crewboard_core::types::{DbId, Timestamp};
use crewboard_db::repositories::{MemberRepo, ProjectRepo};
use sqlx::PgConnection;

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

/// Whole-second UTC instant, so values survive the microsecond round trip.
pub fn at(month: u32, day: u32, hour: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2026, month, day, hour, 0, 0).unwrap()
}

/// Insert an account directly; the account table is owned elsewhere.
pub async fn user(conn: &mut PgConnection, name: &str) -> DbId {
    sqlx::query_scalar("INSERT INTO users (email, name) VALUES ($1, $2) RETURNING id")
        .bind(format!("{name}@example.com"))
        .bind(name)
        .fetch_one(conn)
        .await
        .unwrap()
}

/// ACTIVE project starting Jan 1 and due on `end`.
pub async fn project(conn: &mut PgConnection, name: &str, end: NaiveDate) -> DbId {
    let input = CreateProject {
        name: name.to_string(),
        description: None,
        start_date: date(1, 1),
        end_date: end,
    };
    ProjectRepo::create(conn, &input, at(1, 1, 0)).await.unwrap().id
}

pub async fn project_with_status(
    conn: &mut PgConnection,
    name: &str,
    end: NaiveDate,
    status: ProjectStatus,
) -> DbId {
    let id = project(conn, name, end).await;
    ProjectRepo::set_status(conn, id, status, at(1, 2, 0))
        .await
        .unwrap();
    id
}

pub async fn member(
    conn: &mut PgConnection,
    project_id: DbId,
    user_id: DbId,
    role: MemberRole,
    status: MemberStatus,
) {
    MemberRepo::insert(conn, project_id, user_id, role, status, at(1, 1, 0))
        .await
        .unwrap();
}
