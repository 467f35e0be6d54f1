use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// How a failing step affects the cascade.
pub enum SignalTier {
    /// Fetch failure aborts the cascade.
    Primary,
    /// Fetch failure skips the step.
    Secondary,
    /// Fetch failure skips the step; per-resource sub-queries.
    Extended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
/// Activity signals in cascade order.
pub enum SignalStep {
    MergeRequestMerges,
    ReleaseAuthors,
    SnippetAwardEmoji,
    AuditEvents,
    ManualJobs,
    PipelineSchedules,
    UserEvents,
    ResourceLabelEvents,
    ResourceStateEvents,
    AwardEmoji,
    ProjectEvents,
}

impl SignalStep {
    pub const ORDER: [SignalStep; 11] = [
        SignalStep::MergeRequestMerges,
        SignalStep::ReleaseAuthors,
        SignalStep::SnippetAwardEmoji,
        SignalStep::AuditEvents,
        SignalStep::ManualJobs,
        SignalStep::PipelineSchedules,
        SignalStep::UserEvents,
        SignalStep::ResourceLabelEvents,
        SignalStep::ResourceStateEvents,
        SignalStep::AwardEmoji,
        SignalStep::ProjectEvents,
    ];

    pub fn tier(self) -> SignalTier {
        match self {
            // Snippet awards stay fatal even though they are a weaker signal.
            SignalStep::MergeRequestMerges
            | SignalStep::ReleaseAuthors
            | SignalStep::SnippetAwardEmoji => SignalTier::Primary,
            SignalStep::AuditEvents | SignalStep::ManualJobs | SignalStep::PipelineSchedules => {
                SignalTier::Secondary
            }
            SignalStep::UserEvents
            | SignalStep::ResourceLabelEvents
            | SignalStep::ResourceStateEvents
            | SignalStep::AwardEmoji
            | SignalStep::ProjectEvents => SignalTier::Extended,
        }
    }

    pub fn is_fatal(self) -> bool {
        self.tier() == SignalTier::Primary
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalStep::MergeRequestMerges => "merge_request_merges",
            SignalStep::ReleaseAuthors => "release_authors",
            SignalStep::SnippetAwardEmoji => "snippet_award_emoji",
            SignalStep::AuditEvents => "audit_events",
            SignalStep::ManualJobs => "manual_jobs",
            SignalStep::PipelineSchedules => "pipeline_schedules",
            SignalStep::UserEvents => "user_events",
            SignalStep::ResourceLabelEvents => "resource_label_events",
            SignalStep::ResourceStateEvents => "resource_state_events",
            SignalStep::AwardEmoji => "award_emoji",
            SignalStep::ProjectEvents => "project_events",
        }
    }
}

impl fmt::Display for SignalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
