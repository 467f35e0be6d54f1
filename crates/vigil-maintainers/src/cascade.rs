use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};
use vigil_gitlab::{
    ActivitySource, AuditEvent, AwardEmoji, AwardTarget, Commit, Endpoint, Issue, Job,
    MergeRequest, Pipeline, PipelineSchedule, ProjectEvent, ProjectId, Release, ResourceEvent,
    ResourceEventKind, ResourceTarget, Snippet, SourceError, UserSummary,
};

use crate::{
    normalize_handle, recent_activity, ActivityError, ActivityEvidence, ActivityLedger,
    ActivityRecord, MaintainerActivityConfig, MarkOutcome, Paginator, PrivilegedAccounts,
    SignalStep,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Completed { newly_active: usize },
    /// Best-effort failure; accounts confirmed before the failure stay confirmed.
    Failed { newly_active: usize, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: SignalStep,
    #[serde(flatten)]
    pub status: StepStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Steps that ran, in order, and whether the walk stopped before the end.
pub struct CascadeReport {
    pub steps: Vec<StepOutcome>,
    pub early_terminated: bool,
}

impl CascadeReport {
    pub fn ran(&self, step: SignalStep) -> bool {
        self.steps.iter().any(|outcome| outcome.step == step)
    }
}

/// Runs the signal steps in `SignalStep::ORDER` against one ledger.
pub(crate) struct SignalCascade<'a> {
    source: &'a dyn ActivitySource,
    project: ProjectId,
    config: &'a MaintainerActivityConfig,
    accounts: &'a PrivilegedAccounts,
    ledger: &'a mut ActivityLedger,
    resource_targets: Option<Vec<ResourceTarget>>,
}

impl<'a> SignalCascade<'a> {
    pub(crate) fn new(
        source: &'a dyn ActivitySource,
        project: ProjectId,
        config: &'a MaintainerActivityConfig,
        accounts: &'a PrivilegedAccounts,
        ledger: &'a mut ActivityLedger,
    ) -> Self {
        Self {
            source,
            project,
            config,
            accounts,
            ledger,
            resource_targets: None,
        }
    }

    pub(crate) async fn run(mut self) -> Result<CascadeReport, ActivityError> {
        let mut report = CascadeReport::default();
        for step in SignalStep::ORDER {
            if self.ledger.all_active() {
                tracing::debug!(
                    next_step = step.as_str(),
                    "every privileged account is active; skipping remaining signals"
                );
                report.early_terminated = true;
                break;
            }

            let active_before = self.ledger.active_count();
            tracing::debug!(
                step = step.as_str(),
                pending = self.ledger.pending().len(),
                "collecting activity signal"
            );
            let result = self.run_step(step).await;
            let newly_active = self.ledger.active_count().saturating_sub(active_before);
            match result {
                Ok(()) => {
                    tracing::debug!(step = step.as_str(), newly_active, "activity signal done");
                    report.steps.push(StepOutcome {
                        step,
                        status: StepStatus::Completed { newly_active },
                    });
                }
                Err(error) if step.is_fatal() => {
                    return Err(ActivityError::CollectActivity {
                        step,
                        source: Arc::new(error),
                    });
                }
                Err(error) => {
                    tracing::warn!(
                        step = step.as_str(),
                        newly_active,
                        %error,
                        "best-effort activity signal failed; continuing"
                    );
                    report.steps.push(StepOutcome {
                        step,
                        status: StepStatus::Failed {
                            newly_active,
                            message: error.to_string(),
                        },
                    });
                }
            }
        }
        Ok(report)
    }

    async fn run_step(&mut self, step: SignalStep) -> Result<(), SourceError> {
        let cutoff = self.config.cutoff;
        match step {
            SignalStep::MergeRequestMerges => {
                self.collect::<MergeRequest>(
                    step,
                    Endpoint::MergeRequests {
                        updated_after: cutoff,
                    },
                )
                .await
            }
            SignalStep::ReleaseAuthors => self.collect::<Release>(step, Endpoint::Releases).await,
            SignalStep::SnippetAwardEmoji => self.snippet_award_emoji(step).await,
            SignalStep::AuditEvents => self.audit_events(step).await,
            SignalStep::ManualJobs => self.manual_jobs(step).await,
            SignalStep::PipelineSchedules => {
                self.collect::<PipelineSchedule>(step, Endpoint::PipelineSchedules)
                    .await
            }
            SignalStep::UserEvents => self.user_events(step).await,
            SignalStep::ResourceLabelEvents => {
                self.resource_events(step, &[ResourceEventKind::Label])
                    .await
            }
            SignalStep::ResourceStateEvents => {
                self.resource_events(
                    step,
                    &[ResourceEventKind::State, ResourceEventKind::Milestone],
                )
                .await
            }
            SignalStep::AwardEmoji => self.award_emoji(step).await,
            SignalStep::ProjectEvents => {
                self.collect::<ProjectEvent>(
                    step,
                    Endpoint::ProjectEvents {
                        after: feed_after_date(cutoff),
                    },
                )
                .await
            }
        }
    }

    fn pages<T>(&self, endpoint: Endpoint) -> Paginator<'a, T>
    where
        T: DeserializeOwned,
    {
        Paginator::new(
            self.source,
            self.project,
            endpoint,
            self.config.effective_page_size(),
        )
    }

    fn observe<R>(&mut self, step: SignalStep, record: &R) -> MarkOutcome
    where
        R: ActivityRecord,
    {
        let Some((actor, occurred_at)) = recent_activity(record, self.config.cutoff) else {
            return MarkOutcome::Ignored;
        };
        self.ledger
            .mark_active(actor, ActivityEvidence { step, occurred_at })
    }

    /// Walks a flat feed, crediting each record's actor.
    async fn collect<R>(&mut self, step: SignalStep, endpoint: Endpoint) -> Result<(), SourceError>
    where
        R: DeserializeOwned + ActivityRecord,
    {
        let mut pages = self.pages::<R>(endpoint);
        while let Some(records) = pages.next_page().await? {
            for record in &records {
                self.observe(step, record);
            }
            if self.ledger.all_active() {
                break;
            }
        }
        Ok(())
    }

    /// Credits audit events by member id; the username is only consulted
    /// when the event carries no `author_id`.
    async fn audit_events(&mut self, step: SignalStep) -> Result<(), SourceError> {
        let cutoff = self.config.cutoff;
        let accounts = self.accounts;
        let mut pages = self.pages::<AuditEvent>(Endpoint::AuditEvents {
            created_after: cutoff,
        });
        while let Some(events) = pages.next_page().await? {
            for event in &events {
                match event.author_id {
                    Some(author_id) => {
                        let Some(handle) = accounts.handle_for_id(author_id) else {
                            continue;
                        };
                        let Some(occurred_at) = event.created_at.filter(|at| *at > cutoff) else {
                            continue;
                        };
                        self.ledger
                            .mark_active(handle, ActivityEvidence { step, occurred_at });
                    }
                    None => {
                        self.observe(step, event);
                    }
                }
            }
            if self.ledger.all_active() {
                break;
            }
        }
        Ok(())
    }

    async fn snippet_award_emoji(&mut self, step: SignalStep) -> Result<(), SourceError> {
        let mut snippets = self.pages::<Snippet>(Endpoint::Snippets);
        while let Some(page) = snippets.next_page().await? {
            for snippet in page {
                self.collect::<AwardEmoji>(
                    step,
                    Endpoint::AwardEmoji {
                        target: AwardTarget::Snippet(snippet.id),
                    },
                )
                .await?;
                if self.ledger.all_active() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    async fn manual_jobs(&mut self, step: SignalStep) -> Result<(), SourceError> {
        let mut pipelines = self.pages::<Pipeline>(Endpoint::Pipelines {
            updated_after: self.config.cutoff,
        });
        while let Some(page) = pipelines.next_page().await? {
            for pipeline in page {
                let mut jobs = self.pages::<Job>(Endpoint::PipelineJobs {
                    pipeline_id: pipeline.id,
                    scopes: self.config.job_scopes.clone(),
                });
                while let Some(job_page) = jobs.next_page().await? {
                    for job in &job_page {
                        self.observe(step, job);
                        if self.ledger.all_active() {
                            return Ok(());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn user_events(&mut self, step: SignalStep) -> Result<(), SourceError> {
        let cutoff = self.config.cutoff;
        let after = feed_after_date(cutoff);
        for handle in self.ledger.pending() {
            // Unknown users and failed lookups are indistinguishable here.
            let user_id = match self.lookup_user_id(&handle).await {
                Ok(Some(user_id)) => user_id,
                Ok(None) => {
                    tracing::debug!(handle = handle.as_str(), "no user matches handle; skipping");
                    continue;
                }
                Err(error) => {
                    tracing::warn!(
                        handle = handle.as_str(),
                        %error,
                        "user lookup failed; skipping account"
                    );
                    continue;
                }
            };

            let mut events = self.pages::<ProjectEvent>(Endpoint::UserEvents { user_id, after });
            'feed: loop {
                let page = match events.next_page().await {
                    Ok(Some(page)) => page,
                    Ok(None) => break,
                    Err(error) => {
                        tracing::warn!(
                            handle = handle.as_str(),
                            user_id,
                            %error,
                            "user event feed failed; skipping account"
                        );
                        break;
                    }
                };
                for event in &page {
                    if event.project_id != Some(self.project.0) {
                        continue;
                    }
                    let Some(occurred_at) = event.created_at.filter(|at| *at > cutoff) else {
                        continue;
                    };
                    self.ledger
                        .mark_active(&handle, ActivityEvidence { step, occurred_at });
                    break 'feed;
                }
            }
            if self.ledger.all_active() {
                break;
            }
        }
        Ok(())
    }

    async fn lookup_user_id(&self, handle: &str) -> Result<Option<u64>, SourceError> {
        let mut users = self.pages::<UserSummary>(Endpoint::UsersByUsername {
            username: handle.to_string(),
        });
        let candidates = users.next_page().await?.unwrap_or_default();
        Ok(candidates
            .into_iter()
            .find(|user| normalize_handle(&user.username).as_deref() == Some(handle))
            .map(|user| user.id))
    }

    /// Issues then merge requests updated after the cutoff, listed once per run.
    async fn resource_targets(&mut self) -> Result<Vec<ResourceTarget>, SourceError> {
        if let Some(targets) = &self.resource_targets {
            return Ok(targets.clone());
        }
        let cutoff = self.config.cutoff;
        let issues = self
            .pages::<Issue>(Endpoint::Issues {
                updated_after: cutoff,
            })
            .collect_all()
            .await?;
        let merge_requests = self
            .pages::<MergeRequest>(Endpoint::MergeRequests {
                updated_after: cutoff,
            })
            .collect_all()
            .await?;
        let targets: Vec<ResourceTarget> = issues
            .iter()
            .map(|issue| ResourceTarget::issue(issue.iid))
            .chain(
                merge_requests
                    .iter()
                    .map(|merge_request| ResourceTarget::merge_request(merge_request.iid)),
            )
            .collect();
        tracing::debug!(
            issues = issues.len(),
            merge_requests = merge_requests.len(),
            "listed resources updated after cutoff"
        );
        self.resource_targets = Some(targets.clone());
        Ok(targets)
    }

    async fn resource_events(
        &mut self,
        step: SignalStep,
        kinds: &[ResourceEventKind],
    ) -> Result<(), SourceError> {
        for target in self.resource_targets().await? {
            for kind in kinds {
                self.collect::<ResourceEvent>(
                    step,
                    Endpoint::ResourceEvents {
                        target,
                        kind: *kind,
                    },
                )
                .await?;
                if self.ledger.all_active() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    async fn award_emoji(&mut self, step: SignalStep) -> Result<(), SourceError> {
        for target in self.resource_targets().await? {
            self.collect::<AwardEmoji>(
                step,
                Endpoint::AwardEmoji {
                    target: AwardTarget::Resource(target),
                },
            )
            .await?;
            if self.ledger.all_active() {
                return Ok(());
            }
        }

        let commits = self
            .pages::<Commit>(Endpoint::Commits {
                since: self.config.cutoff,
            })
            .collect_all()
            .await?;
        for commit in commits {
            self.collect::<AwardEmoji>(
                step,
                Endpoint::AwardEmoji {
                    target: AwardTarget::Commit(commit.id),
                },
            )
            .await?;
            if self.ledger.all_active() {
                return Ok(());
            }
        }

        self.snippet_award_emoji(step).await
    }
}

/// Date filter for feeds whose `after` parameter is exclusive and
/// day-granular; the exact instant comparison happens locally.
fn feed_after_date(cutoff: DateTime<Utc>) -> NaiveDate {
    (cutoff - Duration::days(1)).date_naive()
}
