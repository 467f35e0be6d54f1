//! GitLab host capabilities consumed by the maintainer-activity engine.
//!
//! `ActivitySource` is the seam the engine calls into; `GitlabApiClient` is
//! the REST implementation of it.
mod access_level;
mod client;
mod endpoint;
mod records;
mod retry;
mod types;

pub use access_level::{AccessLevel, AccessLevelParseError};
pub use client::{GitlabApiClient, GitlabConfig, DEFAULT_GITLAB_API_BASE};
pub use endpoint::{AwardTarget, Endpoint, ResourceEventKind, ResourceKind, ResourceTarget};
pub use records::{
    AuditEvent, AuditEventDetails, AwardEmoji, Commit, Issue, Job, MergeRequest, Pipeline,
    PipelineSchedule, ProjectEvent, ProjectMember, Release, ResourceEvent, Snippet, UserRef,
    UserSummary,
};
pub use types::{ActivitySource, Page, PageRequest, ProjectId, SourceError};
