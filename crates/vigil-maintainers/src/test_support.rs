//! In-memory `ActivitySource` with scripted pages, keyed by endpoint path.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use serde_json::Value;
use vigil_gitlab::{ActivitySource, Endpoint, Page, PageRequest, ProjectId, SourceError};

enum Route {
    Pages(Vec<Vec<Value>>),
    /// Empty on the first walk, `records` on every later one.
    Revisit(Vec<Value>),
    Failure(u16),
}

#[derive(Default)]
pub(crate) struct ScriptedSource {
    projects: HashMap<String, u64>,
    project_failure: Option<u16>,
    routes: HashMap<String, Route>,
    fetched: Mutex<Vec<String>>,
    resolutions: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_project(mut self, path: &str, id: u64) -> Self {
        self.projects.insert(path.to_string(), id);
        self
    }

    pub(crate) fn with_project_failure(mut self, status: u16) -> Self {
        self.project_failure = Some(status);
        self
    }

    /// One page per JSON array.
    pub(crate) fn with_pages(mut self, key: &str, pages: Vec<Value>) -> Self {
        let pages = pages
            .into_iter()
            .map(|page| match page {
                Value::Array(items) => items,
                other => vec![other],
            })
            .collect();
        self.routes.insert(key.to_string(), Route::Pages(pages));
        self
    }

    pub(crate) fn with_records(self, key: &str, records: Value) -> Self {
        self.with_pages(key, vec![records])
    }

    pub(crate) fn with_records_on_revisit(mut self, key: &str, records: Value) -> Self {
        let records = match records {
            Value::Array(items) => items,
            other => vec![other],
        };
        self.routes.insert(key.to_string(), Route::Revisit(records));
        self
    }

    pub(crate) fn with_failure(mut self, key: &str, status: u16) -> Self {
        self.routes.insert(key.to_string(), Route::Failure(status));
        self
    }

    /// Every fetch as `key#page`, in call order.
    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().expect("fetch log lock").clone()
    }

    pub(crate) fn fetch_count(&self, key: &str) -> usize {
        self.fetched()
            .iter()
            .filter(|entry| entry.split('#').next() == Some(key))
            .count()
    }

    pub(crate) fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

fn route_key(project: ProjectId, endpoint: &Endpoint) -> String {
    match endpoint {
        Endpoint::UsersByUsername { username } => format!("users?username={username}"),
        other => other.path(project),
    }
}

#[async_trait]
impl ActivitySource for ScriptedSource {
    async fn resolve_project_id(&self, project: &str) -> Result<ProjectId, SourceError> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.project_failure {
            return Err(SourceError::Http {
                operation: "resolve project id".to_string(),
                status,
                body: "scripted project failure".to_string(),
            });
        }
        if let Some(id) = self.projects.get(project) {
            return Ok(ProjectId(*id));
        }
        project
            .parse::<u64>()
            .map(ProjectId)
            .map_err(|_| SourceError::Http {
                operation: "resolve project id".to_string(),
                status: 404,
                body: "404 Project Not Found".to_string(),
            })
    }

    async fn fetch_page(
        &self,
        project: ProjectId,
        endpoint: &Endpoint,
        request: PageRequest,
    ) -> Result<Page<Value>, SourceError> {
        let key = route_key(project, endpoint);
        let first_walk = {
            let mut fetched = self.fetched.lock().expect("fetch log lock");
            let first_walk = !fetched
                .iter()
                .any(|entry| entry.split('#').next() == Some(key.as_str()));
            fetched.push(format!("{key}#{}", request.page));
            first_walk
        };
        match self.routes.get(&key) {
            None => Ok(Page::last(Vec::new())),
            Some(Route::Failure(status)) => Err(SourceError::Http {
                operation: endpoint.label().to_string(),
                status: *status,
                body: "scripted failure".to_string(),
            }),
            Some(Route::Revisit(_)) if first_walk => Ok(Page::last(Vec::new())),
            Some(Route::Revisit(records)) => Ok(Page::last(records.clone())),
            Some(Route::Pages(pages)) => {
                let index = usize::try_from(request.page.saturating_sub(1)).unwrap_or(usize::MAX);
                let items = pages.get(index).cloned().unwrap_or_default();
                let next_page = (index.saturating_add(1) < pages.len())
                    .then(|| request.page.saturating_add(1));
                Ok(Page { items, next_page })
            }
        }
    }
}
