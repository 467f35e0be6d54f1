use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;

use crate::retry::{
    is_retryable_status, is_retryable_transport_error, parse_retry_after_ms, retry_delay,
    truncate_for_error, BASE_BACKOFF_MS,
};
use crate::{ActivitySource, Endpoint, Page, PageRequest, ProjectId, SourceError};

pub const DEFAULT_GITLAB_API_BASE: &str = "https://gitlab.com/api/v4";
const NEXT_PAGE_HEADER: &str = "x-next-page";

#[derive(Debug, Clone)]
/// Connection settings for `GitlabApiClient`.
pub struct GitlabConfig {
    pub api_base: String,
    /// Personal/project access token; empty for anonymous access.
    pub token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

impl Default for GitlabConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GITLAB_API_BASE.to_string(),
            token: String::new(),
            request_timeout_ms: 30_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: BASE_BACKOFF_MS,
        }
    }
}

#[derive(Debug, Clone)]
/// REST implementation of `ActivitySource` for GitLab's v4 API.
pub struct GitlabApiClient {
    http: reqwest::Client,
    api_base: reqwest::Url,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl GitlabApiClient {
    pub fn new(config: GitlabConfig) -> Result<Self, SourceError> {
        let api_base = reqwest::Url::parse(config.api_base.trim()).map_err(|error| {
            SourceError::InvalidConfig(format!(
                "invalid api base '{}': {error}",
                config.api_base
            ))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(SourceError::InvalidConfig(format!(
                "api base '{}' cannot carry a path",
                config.api_base
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("vigil-maintainers"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let token = config.token.trim();
        if !token.is_empty() {
            let mut value = HeaderValue::from_str(token).map_err(|error| {
                SourceError::InvalidConfig(format!("invalid gitlab token header: {error}"))
            })?;
            value.set_sensitive(true);
            headers.insert("PRIVATE-TOKEN", value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(|error| {
                SourceError::InvalidConfig(format!("failed to create gitlab api client: {error}"))
            })?;
        Ok(Self {
            http,
            api_base,
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
        })
    }

    fn url_for<I>(&self, segments: I) -> Result<reqwest::Url, SourceError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidConfig("api base cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_with_retry<F>(
        &self,
        operation: &str,
        mut request_builder: F,
    ) -> Result<reqwest::Response, SourceError>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = request_builder()
                .header("x-vigil-retry-attempt", attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let retry_after = parse_retry_after_ms(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts && is_retryable_status(status.as_u16()) {
                        tracing::debug!(
                            operation,
                            status = status.as_u16(),
                            attempt,
                            "retrying gitlab request"
                        );
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    return Err(SourceError::Http {
                        operation: operation.to_string(),
                        status: status.as_u16(),
                        body: truncate_for_error(&body),
                    });
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tracing::debug!(operation, attempt, %error, "retrying gitlab transport error");
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(SourceError::Transport {
                        operation: operation.to_string(),
                        message: error.to_string(),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl ActivitySource for GitlabApiClient {
    async fn resolve_project_id(&self, project: &str) -> Result<ProjectId, SourceError> {
        #[derive(Deserialize)]
        struct ProjectLookup {
            id: u64,
        }

        let project = project.trim().trim_matches('/');
        if project.is_empty() {
            return Err(SourceError::InvalidConfig(
                "project identifier is empty".to_string(),
            ));
        }
        if let Ok(id) = project.parse::<u64>() {
            return Ok(ProjectId(id));
        }

        let operation = "resolve project id";
        let url = self.url_for(["projects", project])?;
        let response = self
            .send_with_retry(operation, || self.http.get(url.clone()))
            .await?;
        let lookup = response
            .json::<ProjectLookup>()
            .await
            .map_err(|error| SourceError::Decode {
                operation: operation.to_string(),
                message: error.to_string(),
            })?;
        Ok(ProjectId(lookup.id))
    }

    async fn fetch_page(
        &self,
        project: ProjectId,
        endpoint: &Endpoint,
        request: PageRequest,
    ) -> Result<Page<Value>, SourceError> {
        let operation = endpoint.label();
        let url = self.url_for(endpoint.path_segments(project))?;
        let mut query = endpoint.query();
        query.push(("per_page", request.per_page.to_string()));
        query.push(("page", request.page.to_string()));

        let response = self
            .send_with_retry(operation, || self.http.get(url.clone()).query(&query))
            .await?;
        let next_page_header = response
            .headers()
            .get(NEXT_PAGE_HEADER)
            .map(|value| value.to_str().unwrap_or_default().to_string());
        let items = response
            .json::<Vec<Value>>()
            .await
            .map_err(|error| SourceError::Decode {
                operation: operation.to_string(),
                message: error.to_string(),
            })?;
        let next_page = next_page_token(next_page_header.as_deref(), request, items.len());
        Ok(Page { items, next_page })
    }
}

/// Reads `x-next-page`; when the host omits it, a full page implies another.
fn next_page_token(header: Option<&str>, request: PageRequest, item_count: usize) -> Option<u32> {
    match header {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|next| *next > request.page),
        None => {
            let per_page = usize::try_from(request.per_page).unwrap_or(usize::MAX);
            (item_count > 0 && item_count >= per_page).then(|| request.page.saturating_add(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{next_page_token, GitlabApiClient, GitlabConfig};
    use crate::{PageRequest, SourceError};

    #[test]
    fn unit_next_page_token_prefers_header() {
        let request = PageRequest {
            page: 2,
            per_page: 100,
        };
        assert_eq!(next_page_token(Some("3"), request, 100), Some(3));
        assert_eq!(next_page_token(Some(""), request, 100), None);
        assert_eq!(next_page_token(Some("2"), request, 100), None);
    }

    #[test]
    fn unit_next_page_token_falls_back_to_full_page_heuristic() {
        let request = PageRequest {
            page: 1,
            per_page: 2,
        };
        assert_eq!(next_page_token(None, request, 2), Some(2));
        assert_eq!(next_page_token(None, request, 1), None);
        assert_eq!(next_page_token(None, request, 0), None);
    }

    #[test]
    fn regression_client_rejects_unusable_api_base() {
        let error = GitlabApiClient::new(GitlabConfig {
            api_base: "mailto:ops@example.com".to_string(),
            ..GitlabConfig::default()
        })
        .expect_err("non-hierarchical base should be rejected");
        assert!(matches!(error, SourceError::InvalidConfig(_)));

        let error = GitlabApiClient::new(GitlabConfig {
            api_base: "not a url".to_string(),
            ..GitlabConfig::default()
        })
        .expect_err("garbage base should be rejected");
        assert!(matches!(error, SourceError::InvalidConfig(_)));
    }

    #[test]
    fn unit_url_for_encodes_nested_project_paths() {
        let client = GitlabApiClient::new(GitlabConfig {
            api_base: "https://gitlab.example.com/api/v4/".to_string(),
            ..GitlabConfig::default()
        })
        .expect("client should build");
        let url = client
            .url_for(["projects", "group/sub/name"])
            .expect("url should build");
        assert_eq!(
            url.as_str(),
            "https://gitlab.example.com/api/v4/projects/group%2Fsub%2Fname"
        );
    }
}
