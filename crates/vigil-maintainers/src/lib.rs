//! Maintainer-activity inference for GitLab projects.
//!
//! Given a project and a cutoff instant, `MaintainerActivityHandler` works out
//! which privileged members (Developer and above by default) have verifiable
//! activity after the cutoff. Signals are consulted in a fixed order from the
//! most reliable and cheapest to the noisiest and most expensive, and the walk
//! stops as soon as every privileged account has been confirmed.
mod cascade;
mod config;
mod error;
mod handler;
mod ledger;
mod paginator;
mod resolver;
mod signal_step;
mod signals;

#[cfg(test)]
mod test_support;

pub use cascade::{CascadeReport, StepOutcome, StepStatus};
pub use config::{
    MaintainerActivityConfig, DEFAULT_JOB_SCOPES, DEFAULT_LOOKBACK_DAYS, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
pub use error::ActivityError;
pub use handler::{MaintainerActivityHandler, MaintainerActivityReport};
pub use ledger::{normalize_handle, ActivityEvidence, ActivityLedger, MarkOutcome};
pub use paginator::Paginator;
pub use resolver::{resolve_privileged_accounts, PrivilegedAccounts};
pub use signal_step::{SignalStep, SignalTier};
pub use signals::{recent_activity, ActivityRecord};
