//! Executes role plans against a store.

use super::differ::{RolePlan, StateDiffer};
use super::identity::distinct_ids;
use super::report::{OutcomeReporter, RoleOutcome, SyncReport};
use crate::Result;
use crate::models::{DesiredState, PermissionId, PermissionSpec, RoleDefinition};
use crate::storage::RoleStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, instrument, warn};

/// Options for a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Classify and report only; perform no writes.
    pub dry_run: bool,
    /// Emit per-role detail.
    pub verbose: bool,
    /// Replace the permission set of existing roles instead of skipping them.
    pub force: bool,
    /// Restrict the run to these role names. `None` means every role.
    pub roles: Option<Vec<String>>,
}

impl SyncOptions {
    /// Sets dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets verbose mode.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets force mode.
    #[must_use]
    pub const fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Restricts the run to the named roles.
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }
}

/// Reconciles a desired state against a [`RoleStore`].
///
/// Roles are processed one at a time in declaration order. A failure while
/// handling one role is recorded in the report and the run moves on to the
/// next role; nothing is rolled back across roles.
pub struct Reconciler<'a, S: RoleStore + ?Sized> {
    store: &'a S,
    options: SyncOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, S: RoleStore + ?Sized> Reconciler<'a, S> {
    /// Creates a reconciler borrowing the store for the duration of a run.
    #[must_use]
    pub const fn new(store: &'a S, options: SyncOptions) -> Self {
        Self {
            store,
            options,
            cancel: None,
        }
    }

    /// Stops the run before the next role once the flag is set.
    #[must_use]
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Runs reconciliation and returns the aggregated report.
    ///
    /// Per-role failures never abort the run.
    #[instrument(
        skip(self, desired),
        fields(
            dry_run = self.options.dry_run,
            force = self.options.force,
            roles = desired.len()
        )
    )]
    pub fn run(&self, desired: &DesiredState) -> SyncReport {
        let (scoped, unknown) = desired.scoped(self.options.roles.as_deref());
        for name in &unknown {
            warn!(role = %name, "requested role is not declared in the desired state");
        }

        let mut reporter = OutcomeReporter::new(self.options.dry_run, self.options.verbose);
        reporter.note_unknown(unknown);

        if self.options.dry_run {
            info!("dry run: no changes will be made");
        }

        let differ = StateDiffer::new(self.store, self.options.force);
        for definition in &scoped {
            if self.is_cancelled() {
                warn!(role = %definition.name, "sync cancelled, remaining roles left unprocessed");
                reporter.mark_cancelled();
                break;
            }

            let outcome = match self.reconcile_role(&differ, definition) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(role = %definition.name, error = %e, "failed to process role");
                    RoleOutcome::Failed(e.to_string())
                },
            };
            reporter.record(&definition.name, outcome);
        }

        let report = reporter.finish();
        info!(
            created = report.stats.created,
            updated = report.stats.updated,
            skipped = report.stats.skipped,
            failed = report.stats.failed,
            "sync finished"
        );
        report
    }

    fn reconcile_role(
        &self,
        differ: &StateDiffer<'_, S>,
        definition: &RoleDefinition,
    ) -> Result<RoleOutcome> {
        let plan = differ.plan_role(definition)?;
        if self.options.dry_run {
            return Ok(predict(&plan));
        }
        self.apply(plan)
    }

    fn apply(&self, plan: RolePlan) -> Result<RoleOutcome> {
        match plan {
            RolePlan::Create { name, permissions } => {
                let ids = self.upsert_all(&permissions)?;
                let role_id = self.store.create_role(&name, &ids)?;
                debug!(role = %name, role_id = %role_id, permissions = ids.len(), "created role");
                Ok(RoleOutcome::Created)
            },
            RolePlan::Replace {
                name,
                role_id,
                permissions,
            } => {
                self.store.detach_all_permissions(role_id)?;
                let ids = self.upsert_all(&permissions)?;
                self.store.replace_role_permissions(role_id, &ids)?;
                debug!(role = %name, role_id = %role_id, permissions = ids.len(), "replaced role permissions");
                Ok(RoleOutcome::Updated)
            },
            RolePlan::Skip { name } => {
                debug!(role = %name, "skipping existing role");
                Ok(RoleOutcome::Skipped)
            },
        }
    }

    /// Upserts each grant in order; all complete before any bind call.
    fn upsert_all(&self, permissions: &[PermissionSpec]) -> Result<Vec<PermissionId>> {
        let ids = permissions
            .iter()
            .map(|p| {
                self.store
                    .upsert_permission(p.action, &p.subject, p.conditions.as_ref())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(distinct_ids(ids))
    }
}

const fn predict(plan: &RolePlan) -> RoleOutcome {
    match plan {
        RolePlan::Create { .. } => RoleOutcome::WouldCreate,
        RolePlan::Replace { .. } => RoleOutcome::WouldUpdate,
        RolePlan::Skip { .. } => RoleOutcome::WouldSkip,
    }
}
