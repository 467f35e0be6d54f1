use chrono::{DateTime, Duration, Utc};
use vigil_gitlab::AccessLevel;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_LOOKBACK_DAYS: u32 = 180;
pub const DEFAULT_JOB_SCOPES: &[&str] = &["success", "failed", "canceled", "manual", "running"];

#[derive(Debug, Clone, PartialEq, Eq)]
/// Inputs that stay fixed for the lifetime of one handler.
pub struct MaintainerActivityConfig {
    /// Activity at or before this instant is not recent.
    pub cutoff: DateTime<Utc>,
    pub min_access_level: AccessLevel,
    pub page_size: u32,
    /// `scope[]` filter for pipeline job listings.
    pub job_scopes: Vec<String>,
}

impl MaintainerActivityConfig {
    pub fn new(cutoff: DateTime<Utc>) -> Self {
        Self {
            cutoff,
            min_access_level: AccessLevel::Developer,
            page_size: DEFAULT_PAGE_SIZE,
            job_scopes: DEFAULT_JOB_SCOPES
                .iter()
                .map(|scope| scope.to_string())
                .collect(),
        }
    }

    pub fn lookback(now: DateTime<Utc>, days: u32) -> Self {
        Self::new(now - Duration::days(i64::from(days)))
    }

    pub fn with_min_access_level(mut self, level: AccessLevel) -> Self {
        self.min_access_level = level;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = clamp_page_size(page_size);
        self
    }

    pub fn with_job_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scopes: Vec<String> = scopes
            .into_iter()
            .map(Into::into)
            .map(|scope| scope.trim().to_ascii_lowercase())
            .filter(|scope| !scope.is_empty())
            .collect();
        if !scopes.is_empty() {
            self.job_scopes = scopes;
        }
        self
    }

    pub(crate) fn effective_page_size(&self) -> u32 {
        clamp_page_size(self.page_size)
    }
}

fn clamp_page_size(page_size: u32) -> u32 {
    page_size.clamp(1, MAX_PAGE_SIZE)
}
