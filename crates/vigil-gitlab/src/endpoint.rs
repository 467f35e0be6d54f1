use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::ProjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Resource families that carry their own event and emoji sub-feeds.
pub enum ResourceKind {
    Issue,
    MergeRequest,
}

impl ResourceKind {
    fn path_segment(self) -> &'static str {
        match self {
            ResourceKind::Issue => "issues",
            ResourceKind::MergeRequest => "merge_requests",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// An issue or merge request addressed by its project-local iid.
pub struct ResourceTarget {
    pub kind: ResourceKind,
    pub iid: u64,
}

impl ResourceTarget {
    pub fn issue(iid: u64) -> Self {
        Self {
            kind: ResourceKind::Issue,
            iid,
        }
    }

    pub fn merge_request(iid: u64) -> Self {
        Self {
            kind: ResourceKind::MergeRequest,
            iid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceEventKind {
    Label,
    State,
    Milestone,
}

impl ResourceEventKind {
    fn path_segment(self) -> &'static str {
        match self {
            ResourceEventKind::Label => "resource_label_events",
            ResourceEventKind::State => "resource_state_events",
            ResourceEventKind::Milestone => "resource_milestone_events",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Anything award emoji can be attached to.
pub enum AwardTarget {
    Resource(ResourceTarget),
    Commit(String),
    Snippet(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Identity of one paginated GitLab list endpoint.
pub enum Endpoint {
    /// Direct and inherited members.
    ProjectMembers,
    MergeRequests {
        updated_after: DateTime<Utc>,
    },
    /// Ordered by release date, newest first.
    Releases,
    Snippets,
    AwardEmoji {
        target: AwardTarget,
    },
    AuditEvents {
        created_after: DateTime<Utc>,
    },
    Pipelines {
        updated_after: DateTime<Utc>,
    },
    PipelineJobs {
        pipeline_id: u64,
        scopes: Vec<String>,
    },
    PipelineSchedules,
    UsersByUsername {
        username: String,
    },
    /// Global feed of one user; `after` is exclusive and date-granular.
    UserEvents {
        user_id: u64,
        after: NaiveDate,
    },
    Issues {
        updated_after: DateTime<Utc>,
    },
    ResourceEvents {
        target: ResourceTarget,
        kind: ResourceEventKind,
    },
    Commits {
        since: DateTime<Utc>,
    },
    /// Project activity feed; `after` is exclusive and date-granular.
    ProjectEvents {
        after: NaiveDate,
    },
}

impl Endpoint {
    /// Short operation label used in logs and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Endpoint::ProjectMembers => "list project members",
            Endpoint::MergeRequests { .. } => "list merge requests",
            Endpoint::Releases => "list releases",
            Endpoint::Snippets => "list snippets",
            Endpoint::AwardEmoji { target } => match target {
                AwardTarget::Resource(ResourceTarget {
                    kind: ResourceKind::Issue,
                    ..
                }) => "list issue award emoji",
                AwardTarget::Resource(ResourceTarget {
                    kind: ResourceKind::MergeRequest,
                    ..
                }) => "list merge request award emoji",
                AwardTarget::Commit(_) => "list commit award emoji",
                AwardTarget::Snippet(_) => "list snippet award emoji",
            },
            Endpoint::AuditEvents { .. } => "list audit events",
            Endpoint::Pipelines { .. } => "list pipelines",
            Endpoint::PipelineJobs { .. } => "list pipeline jobs",
            Endpoint::PipelineSchedules => "list pipeline schedules",
            Endpoint::UsersByUsername { .. } => "lookup user",
            Endpoint::UserEvents { .. } => "list user events",
            Endpoint::Issues { .. } => "list issues",
            Endpoint::ResourceEvents { kind, .. } => match kind {
                ResourceEventKind::Label => "list resource label events",
                ResourceEventKind::State => "list resource state events",
                ResourceEventKind::Milestone => "list resource milestone events",
            },
            Endpoint::Commits { .. } => "list commits",
            Endpoint::ProjectEvents { .. } => "list project events",
        }
    }

    /// Unencoded path segments relative to the API base.
    pub fn path_segments(&self, project: ProjectId) -> Vec<String> {
        let project_root = |rest: &[&str]| {
            let mut segments = vec!["projects".to_string(), project.to_string()];
            segments.extend(rest.iter().map(|segment| segment.to_string()));
            segments
        };
        match self {
            Endpoint::ProjectMembers => project_root(&["members", "all"]),
            Endpoint::MergeRequests { .. } => project_root(&["merge_requests"]),
            Endpoint::Releases => project_root(&["releases"]),
            Endpoint::Snippets => project_root(&["snippets"]),
            Endpoint::AwardEmoji { target } => match target {
                AwardTarget::Resource(resource) => {
                    let iid = resource.iid.to_string();
                    project_root(&[resource.kind.path_segment(), iid.as_str(), "award_emoji"])
                }
                AwardTarget::Commit(sha) => {
                    project_root(&["repository", "commits", sha.as_str(), "award_emoji"])
                }
                AwardTarget::Snippet(snippet_id) => {
                    let snippet_id = snippet_id.to_string();
                    project_root(&["snippets", snippet_id.as_str(), "award_emoji"])
                }
            },
            Endpoint::AuditEvents { .. } => project_root(&["audit_events"]),
            Endpoint::Pipelines { .. } => project_root(&["pipelines"]),
            Endpoint::PipelineJobs { pipeline_id, .. } => {
                let pipeline_id = pipeline_id.to_string();
                project_root(&["pipelines", pipeline_id.as_str(), "jobs"])
            }
            Endpoint::PipelineSchedules => project_root(&["pipeline_schedules"]),
            Endpoint::UsersByUsername { .. } => vec!["users".to_string()],
            Endpoint::UserEvents { user_id, .. } => {
                vec!["users".to_string(), user_id.to_string(), "events".to_string()]
            }
            Endpoint::Issues { .. } => project_root(&["issues"]),
            Endpoint::ResourceEvents { target, kind } => {
                let iid = target.iid.to_string();
                project_root(&[target.kind.path_segment(), iid.as_str(), kind.path_segment()])
            }
            Endpoint::Commits { .. } => project_root(&["repository", "commits"]),
            Endpoint::ProjectEvents { .. } => project_root(&["events"]),
        }
    }

    pub fn path(&self, project: ProjectId) -> String {
        self.path_segments(project).join("/")
    }

    /// Endpoint-specific filters; pagination parameters are added by the client.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::MergeRequests { updated_after } => vec![
                ("state", "all".to_string()),
                ("order_by", "updated_at".to_string()),
                ("updated_after", format_timestamp(updated_after)),
            ],
            Endpoint::Releases => vec![
                ("order_by", "released_at".to_string()),
                ("sort", "desc".to_string()),
            ],
            Endpoint::AuditEvents { created_after } => {
                vec![("created_after", format_timestamp(created_after))]
            }
            Endpoint::Pipelines { updated_after } => {
                vec![("updated_after", format_timestamp(updated_after))]
            }
            Endpoint::PipelineJobs { scopes, .. } => scopes
                .iter()
                .map(|scope| ("scope[]", scope.clone()))
                .collect(),
            Endpoint::UsersByUsername { username } => vec![("username", username.clone())],
            Endpoint::UserEvents { after, .. } | Endpoint::ProjectEvents { after } => {
                vec![("after", after.format("%Y-%m-%d").to_string())]
            }
            Endpoint::Issues { updated_after } => vec![
                ("scope", "all".to_string()),
                ("updated_after", format_timestamp(updated_after)),
            ],
            Endpoint::Commits { since } => vec![("since", format_timestamp(since))],
            Endpoint::ProjectMembers
            | Endpoint::Snippets
            | Endpoint::AwardEmoji { .. }
            | Endpoint::PipelineSchedules
            | Endpoint::ResourceEvents { .. } => Vec::new(),
        }
    }
}

fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}
