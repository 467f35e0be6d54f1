use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use vigil_gitlab::{ActivitySource, ProjectId};

use crate::{
    cascade::{SignalCascade, StepOutcome},
    resolve_privileged_accounts, ActivityError, ActivityEvidence, ActivityLedger,
    MaintainerActivityConfig,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Outcome of one completed setup.
pub struct MaintainerActivityReport {
    pub project_id: ProjectId,
    pub cutoff: DateTime<Utc>,
    /// Every privileged account mapped to whether recent activity was found.
    pub activity: BTreeMap<String, bool>,
    pub evidence: BTreeMap<String, ActivityEvidence>,
    pub steps: Vec<StepOutcome>,
    pub early_terminated: bool,
}

impl MaintainerActivityReport {
    pub fn active_accounts(&self) -> impl Iterator<Item = &str> {
        self.activity
            .iter()
            .filter(|(_, active)| **active)
            .map(|(handle, _)| handle.as_str())
    }

    pub fn inactive_accounts(&self) -> impl Iterator<Item = &str> {
        self.activity
            .iter()
            .filter(|(_, active)| !**active)
            .map(|(handle, _)| handle.as_str())
    }
}

enum SetupState {
    Uninitialized,
    Done(Result<Arc<MaintainerActivityReport>, ActivityError>),
}

/// Answers "which privileged members of this project were active after the
/// cutoff", computing the answer at most once.
///
/// The first caller runs setup while holding the state lock; concurrent
/// callers wait on the lock and then read the stored outcome. Failures are
/// stored too, so a failed handler keeps returning the same error. Build a
/// new handler to retry.
pub struct MaintainerActivityHandler {
    source: Arc<dyn ActivitySource>,
    project: String,
    config: MaintainerActivityConfig,
    state: Mutex<SetupState>,
    setup_runs: AtomicUsize,
}

impl fmt::Debug for MaintainerActivityHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaintainerActivityHandler")
            .field("project", &self.project)
            .field("config", &self.config)
            .field("setup_runs", &self.setup_runs())
            .finish_non_exhaustive()
    }
}

impl MaintainerActivityHandler {
    pub fn new(
        source: Arc<dyn ActivitySource>,
        project: impl Into<String>,
        config: MaintainerActivityConfig,
    ) -> Self {
        Self {
            source,
            project: project.into(),
            config,
            state: Mutex::new(SetupState::Uninitialized),
            setup_runs: AtomicUsize::new(0),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn config(&self) -> &MaintainerActivityConfig {
        &self.config
    }

    /// Number of times setup has actually started.
    pub fn setup_runs(&self) -> usize {
        self.setup_runs.load(Ordering::SeqCst)
    }

    /// Privileged account handles mapped to their recent-activity flag.
    pub async fn maintainer_activity(&self) -> Result<BTreeMap<String, bool>, ActivityError> {
        Ok(self.report().await?.activity.clone())
    }

    pub async fn report(&self) -> Result<Arc<MaintainerActivityReport>, ActivityError> {
        let mut state = self.state.lock().await;
        if let SetupState::Done(outcome) = &*state {
            return outcome.clone();
        }
        // A cancelled setup leaves the state uninitialized for the next caller.
        let outcome = self.run_setup().await.map(Arc::new);
        *state = SetupState::Done(outcome.clone());
        outcome
    }

    #[tracing::instrument(
        name = "maintainer_activity_setup",
        skip(self),
        fields(project = %self.project, cutoff = %self.config.cutoff)
    )]
    async fn run_setup(&self) -> Result<MaintainerActivityReport, ActivityError> {
        self.setup_runs.fetch_add(1, Ordering::SeqCst);
        let source = self.source.as_ref();

        let project_id = source
            .resolve_project_id(&self.project)
            .await
            .map_err(|error| ActivityError::ResolveProject {
                project: self.project.clone(),
                source: Arc::new(error),
            })?;

        let accounts = resolve_privileged_accounts(
            source,
            project_id,
            self.config.min_access_level,
            self.config.effective_page_size(),
        )
        .await
        .map_err(|error| ActivityError::LoadMembers {
            source: Arc::new(error),
        })?;

        let mut ledger = ActivityLedger::new();
        ledger.initialize(accounts.handles());
        if ledger.is_empty() {
            tracing::info!(project_id = project_id.0, "no privileged accounts to check");
            return Ok(MaintainerActivityReport {
                project_id,
                cutoff: self.config.cutoff,
                activity: BTreeMap::new(),
                evidence: BTreeMap::new(),
                steps: Vec::new(),
                early_terminated: false,
            });
        }

        let cascade =
            SignalCascade::new(source, project_id, &self.config, &accounts, &mut ledger)
                .run()
                .await?;
        let report = MaintainerActivityReport {
            project_id,
            cutoff: self.config.cutoff,
            activity: ledger.snapshot(),
            evidence: ledger.evidence().clone(),
            steps: cascade.steps,
            early_terminated: cascade.early_terminated,
        };
        tracing::info!(
            project_id = project_id.0,
            privileged = report.activity.len(),
            active = report.active_accounts().count(),
            steps = report.steps.len(),
            early_terminated = report.early_terminated,
            "maintainer activity setup complete"
        );
        Ok(report)
    }
}
