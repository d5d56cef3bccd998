//! Daily project lifecycle sweeps.
//!
//! [`LifecycleScheduler`] runs once a day at a configured local time. Each
//! run performs four independent sweeps concurrently:
//!
//! | Sweep | Selects | Writes | Notifies |
//! |---|---|---|---|
//! | due-soon | ACTIVE, due tomorrow | nothing | `PROJECT_DUE_SOON` |
//! | auto-close | ACTIVE, due before today | status → DONE | `PROJECT_FINISHED` |
//! | hard-delete-soon | deadline falls tomorrow | nothing | `PROJECT_HARD_DELETE_SOON` |
//! | hard-delete-notice | deadline falls today | nothing | `PROJECT_PERMANENTLY_DELETED` |
//!
//! A sweep reads, writes and collects recipients in one transaction and
//! commits before sending anything, so a crash between the two never loses
//! the state change. Notify-only sweeps are not deduplicated: a second
//! `run_once` for the same day sends the same reminders again.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, FixedOffset, NaiveDate, NaiveTime, Utc};
use crewboard_core::error::StorageError;
use crewboard_core::lifecycle::{day_bounds, local_date, next_run_at};
use crewboard_core::models::Project;
use crewboard_core::store::{Store, StoreResult, StoreTx};
use crewboard_core::types::{DbId, Timestamp};
use crewboard_events::{Notification, NotificationKind, NotificationSink};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Sweep and reports
// ---------------------------------------------------------------------------

/// One of the four daily sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sweep {
    DueSoon,
    AutoClose,
    HardDeleteSoon,
    HardDeleteNotice,
}

impl Sweep {
    pub const ALL: [Sweep; 4] = [
        Sweep::DueSoon,
        Sweep::AutoClose,
        Sweep::HardDeleteSoon,
        Sweep::HardDeleteNotice,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Sweep::DueSoon => "due_soon",
            Sweep::AutoClose => "auto_close",
            Sweep::HardDeleteSoon => "hard_delete_soon",
            Sweep::HardDeleteNotice => "hard_delete_notice",
        }
    }

    pub fn kind(self) -> NotificationKind {
        match self {
            Sweep::DueSoon => NotificationKind::ProjectDueSoon,
            Sweep::AutoClose => NotificationKind::ProjectFinished,
            Sweep::HardDeleteSoon => NotificationKind::ProjectHardDeleteSoon,
            Sweep::HardDeleteNotice => NotificationKind::ProjectPermanentlyDeleted,
        }
    }

    /// Notification body for `project`.
    pub fn message(self, project: &Project) -> String {
        let name = &project.name;
        match self {
            Sweep::DueSoon => format!("Project '{name}' is due tomorrow ({}).", project.end_date),
            Sweep::AutoClose => {
                format!("Project '{name}' has passed its due date and was marked as finished.")
            }
            Sweep::HardDeleteSoon => {
                format!("Project '{name}' will be permanently deleted tomorrow.")
            }
            Sweep::HardDeleteNotice => format!(
                "The grace period for project '{name}' has ended and it has been permanently deleted."
            ),
        }
    }
}

impl fmt::Display for Sweep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counters for one completed sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub sweep: Sweep,
    pub projects_matched: usize,
    /// Rows changed by the sweep's write (auto-close only).
    pub projects_updated: usize,
    pub notifications_sent: usize,
    pub notification_failures: usize,
}

impl SweepReport {
    fn new(sweep: Sweep) -> Self {
        Self {
            sweep,
            projects_matched: 0,
            projects_updated: 0,
            notifications_sent: 0,
            notification_failures: 0,
        }
    }
}

/// Result of a single sweep within a run.
#[derive(Debug)]
pub struct SweepOutcome {
    pub sweep: Sweep,
    pub result: Result<SweepReport, StorageError>,
}

/// Everything one [`LifecycleScheduler::run_once`] did.
#[derive(Debug)]
pub struct RunReport {
    pub today: NaiveDate,
    pub outcomes: Vec<SweepOutcome>,
}

impl RunReport {
    /// The report for `sweep`, if it succeeded.
    pub fn report(&self, sweep: Sweep) -> Option<&SweepReport> {
        self.outcomes
            .iter()
            .find(|o| o.sweep == sweep)
            .and_then(|o| o.result.as_ref().ok())
    }

    /// Sweeps whose storage step failed.
    pub fn failed(&self) -> Vec<Sweep> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.sweep)
            .collect()
    }

    pub fn notifications_sent(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|r| r.notifications_sent)
            .sum()
    }
}

/// A project and the ACTIVE members to notify about it.
struct Target {
    project: Project,
    member_ids: Vec<DbId>,
}

// ---------------------------------------------------------------------------
// LifecycleScheduler
// ---------------------------------------------------------------------------

/// Background service running the daily project sweeps.
pub struct LifecycleScheduler<S> {
    store: S,
    sink: Arc<dyn NotificationSink>,
    offset: FixedOffset,
}

impl<S: Store> LifecycleScheduler<S> {
    pub fn new(store: S, sink: Arc<dyn NotificationSink>, offset: FixedOffset) -> Self {
        Self {
            store,
            sink,
            offset,
        }
    }

    /// Today's date in the configured offset.
    pub fn today(&self) -> NaiveDate {
        local_date(Utc::now(), self.offset)
    }

    /// Run the scheduler loop.
    ///
    /// Sleeps until the next `run_at` in the configured offset, runs all
    /// sweeps for that local day, and repeats. With `run_on_start` one run
    /// for the current day happens first. A local day is never swept twice,
    /// so a startup run before `run_at` moves the first scheduled run to the
    /// next day. The loop exits when `cancel` is cancelled; an in-flight run
    /// is finished first.
    pub async fn run(&self, run_at: NaiveTime, run_on_start: bool, cancel: CancellationToken) {
        tracing::info!(%run_at, offset = %self.offset, run_on_start, "Lifecycle scheduler started");

        let mut last_swept = None;
        if run_on_start {
            let today = self.today();
            self.run_once(today).await;
            last_swept = Some(today);
        }

        loop {
            let now = Utc::now();
            let next = next_sweep_at(now, run_at, self.offset, last_swept);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(next_run = %next, wait_secs = wait.as_secs(), "Next lifecycle run scheduled");

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Lifecycle scheduler cancelled");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    let day = local_date(next, self.offset);
                    self.run_once(day).await;
                    last_swept = Some(day);
                }
            }
        }
    }

    /// Run the four sweeps for `today` concurrently.
    ///
    /// A failing sweep is logged and reported; it does not stop the others.
    pub async fn run_once(&self, today: NaiveDate) -> RunReport {
        let (due_soon, auto_close, delete_soon, delete_notice) = tokio::join!(
            self.sweep_due_soon(today),
            self.sweep_auto_close(today),
            self.sweep_hard_delete_soon(today),
            self.sweep_hard_delete_notice(today),
        );

        let outcomes: Vec<SweepOutcome> = Sweep::ALL
            .into_iter()
            .zip([due_soon, auto_close, delete_soon, delete_notice])
            .map(|(sweep, result)| SweepOutcome { sweep, result })
            .collect();

        for outcome in &outcomes {
            match &outcome.result {
                Ok(r) if r.projects_matched == 0 => {
                    tracing::debug!(sweep = %outcome.sweep, %today, "Lifecycle sweep: nothing to do");
                }
                Ok(r) => {
                    tracing::info!(
                        sweep = %outcome.sweep,
                        %today,
                        matched = r.projects_matched,
                        updated = r.projects_updated,
                        sent = r.notifications_sent,
                        failed = r.notification_failures,
                        "Lifecycle sweep finished"
                    );
                }
                Err(e) => {
                    tracing::error!(sweep = %outcome.sweep, %today, error = %e, "Lifecycle sweep failed");
                }
            }
        }

        RunReport { today, outcomes }
    }

    /// ACTIVE projects due tomorrow.
    async fn sweep_due_soon(&self, today: NaiveDate) -> StoreResult<SweepReport> {
        let tomorrow = next_day(today);
        let mut tx = self.store.begin().await?;
        let projects = tx.projects_due_on(tomorrow).await?;
        let targets = collect_targets(&mut tx, projects).await?;
        tx.commit().await?;

        Ok(self.fan_out(SweepReport::new(Sweep::DueSoon), targets).await)
    }

    /// ACTIVE projects past their due date are flipped to DONE in one write.
    /// Only the projects this write changed are announced.
    async fn sweep_auto_close(&self, today: NaiveDate) -> StoreResult<SweepReport> {
        let mut tx = self.store.begin().await?;
        let mut projects = tx.overdue_active_projects(today).await?;
        let mut report = SweepReport::new(Sweep::AutoClose);
        if !projects.is_empty() {
            let ids: Vec<DbId> = projects.iter().map(|p| p.id).collect();
            let completed = tx.complete_projects(&ids, Utc::now()).await?;
            projects.retain(|p| completed.contains(&p.id));
            report.projects_updated = completed.len();
        }
        let targets = collect_targets(&mut tx, projects).await?;
        tx.commit().await?;

        Ok(self.fan_out(report, targets).await)
    }

    /// Projects whose hard-delete deadline falls tomorrow.
    async fn sweep_hard_delete_soon(&self, today: NaiveDate) -> StoreResult<SweepReport> {
        self.sweep_deadline_day(Sweep::HardDeleteSoon, next_day(today))
            .await
    }

    /// Projects whose hard-delete deadline falls today.
    async fn sweep_hard_delete_notice(&self, today: NaiveDate) -> StoreResult<SweepReport> {
        self.sweep_deadline_day(Sweep::HardDeleteNotice, today).await
    }

    async fn sweep_deadline_day(&self, sweep: Sweep, day: NaiveDate) -> StoreResult<SweepReport> {
        let (start, end) = day_bounds(day, self.offset);
        let mut tx = self.store.begin().await?;
        let projects = tx.projects_hard_deleting_on(start, end).await?;
        let targets = collect_targets(&mut tx, projects).await?;
        tx.commit().await?;

        Ok(self.fan_out(SweepReport::new(sweep), targets).await)
    }

    /// Send one notification per member per project. Delivery failures are
    /// counted and logged, never propagated.
    async fn fan_out(&self, mut report: SweepReport, targets: Vec<Target>) -> SweepReport {
        let kind = report.sweep.kind();
        report.projects_matched = targets.len();

        for target in targets {
            let content = report.sweep.message(&target.project);
            for user_id in target.member_ids {
                let notification =
                    Notification::for_project(user_id, kind, target.project.id, content.clone());
                match self.sink.notify(notification).await {
                    Ok(()) => report.notifications_sent += 1,
                    Err(e) => {
                        report.notification_failures += 1;
                        tracing::warn!(
                            sweep = %report.sweep,
                            project_id = target.project.id,
                            user_id,
                            error = %e,
                            "Failed to deliver lifecycle notification"
                        );
                    }
                }
            }
        }

        report
    }
}

/// The next `run_at` after `now` whose local day comes after `last_swept`.
fn next_sweep_at(
    now: Timestamp,
    run_at: NaiveTime,
    offset: FixedOffset,
    last_swept: Option<NaiveDate>,
) -> Timestamp {
    let mut next = next_run_at(now, run_at, offset);
    while last_swept.is_some_and(|day| local_date(next, offset) <= day) {
        next = next_run_at(next, run_at, offset);
    }
    next
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

async fn collect_targets<T: StoreTx>(tx: &mut T, projects: Vec<Project>) -> StoreResult<Vec<Target>> {
    let mut targets = Vec::with_capacity(projects.len());
    for project in projects {
        let member_ids = tx.active_member_ids(project.id).await?;
        targets.push(Target {
            project,
            member_ids,
        });
    }
    Ok(targets)
}
