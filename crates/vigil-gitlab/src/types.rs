use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::Endpoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Numeric GitLab project identity used in every project-scoped path.
pub struct ProjectId(pub u64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// One-based page selector sent with every list request.
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn first(per_page: u32) -> Self {
        Self { page: 1, per_page }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// One page of records. `next_page == None` means the feed is exhausted.
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page: None,
        }
    }
}

#[derive(Debug, Error)]
/// Failures surfaced by an `ActivitySource`.
pub enum SourceError {
    #[error("gitlab api {operation} failed with status {status}: {body}")]
    Http {
        operation: String,
        status: u16,
        body: String,
    },
    #[error("gitlab api {operation} request failed: {message}")]
    Transport { operation: String, message: String },
    #[error("failed to decode gitlab {operation}: {message}")]
    Decode { operation: String, message: String },
    #[error("invalid gitlab client configuration: {0}")]
    InvalidConfig(String),
}

impl SourceError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[async_trait]
/// Host capabilities the maintainer-activity engine depends on.
///
/// Implementations own transport concerns (auth, retries, pagination
/// headers); callers only see typed pages of raw JSON records.
pub trait ActivitySource: Send + Sync {
    /// Maps a project path (`group/name`) or numeric id to its `ProjectId`.
    async fn resolve_project_id(&self, project: &str) -> Result<ProjectId, SourceError>;

    /// Fetches one page of `endpoint` scoped to `project`.
    async fn fetch_page(
        &self,
        project: ProjectId,
        endpoint: &Endpoint,
        request: PageRequest,
    ) -> Result<Page<Value>, SourceError>;
}
