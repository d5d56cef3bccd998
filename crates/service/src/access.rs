//! Standalone access checks for callers outside the other services
//! (report and file endpoints).

use crewboard_core::access::{self, Decision, Operation};
use crewboard_core::error::ServiceResult;
use crewboard_core::store::{Store, StoreTx};
use crewboard_core::types::DbId;

use crate::support::require_project;

pub struct AccessService<S> {
    store: S,
}

impl<S: Store> AccessService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Evaluate `op` for `user_id` on `project_id` without failing.
    ///
    /// A missing project is still an error.
    pub async fn decide(&self, project_id: DbId, user_id: DbId, op: Operation) -> ServiceResult<Decision> {
        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        let member = tx.load_member(project_id, user_id).await?;
        Ok(access::evaluate(&project, member.as_ref(), op))
    }

    /// Fail with the typed denial unless `user_id` may perform `op`.
    pub async fn check(&self, project_id: DbId, user_id: DbId, op: Operation) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        let project = require_project(&mut tx, project_id).await?;
        let member = tx.load_member(project_id, user_id).await?;
        let decision = access::evaluate(&project, member.as_ref(), op);
        if let Decision::Denied(denial) = decision {
            tracing::debug!(project_id, user_id, ?op, ?denial, "Access denied");
        }
        Ok(decision.into_result(&project)?)
    }
}
