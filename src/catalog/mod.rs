//! Role catalog reconciliation.
//!
//! Reconciliation runs in three stages per role:
//!
//! 1. [`StateDiffer`] looks the role up and classifies it as
//!    [`RolePlan::Create`], [`RolePlan::Replace`] or [`RolePlan::Skip`].
//! 2. [`Reconciler`] executes the plan, upserting permissions by their
//!    [`PermissionKey`] before binding them to the role. In dry-run mode the
//!    plan is turned into a prediction instead.
//! 3. [`OutcomeReporter`] aggregates the per-role results into a [`SyncReport`].

mod differ;
mod identity;
mod reconciler;
mod report;

pub use differ::{RolePlan, StateDiffer, classify};
pub use identity::{PermissionKey, distinct_ids, identity_set};
pub use reconciler::{Reconciler, SyncOptions};
pub use report::{OutcomeReporter, RoleOutcome, RoleReport, SyncReport, SyncStats};
