use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use vigil_gitlab::{ActivitySource, Endpoint, PageRequest, ProjectId, SourceError};

/// Walks one endpoint page by page, decoding records into `T`.
///
/// Call sites loop on `next_page` until it yields `None`; a fetch or decode
/// error ends the walk and is returned to the caller to classify.
pub struct Paginator<'a, T> {
    source: &'a dyn ActivitySource,
    project: ProjectId,
    endpoint: Endpoint,
    next: Option<PageRequest>,
    _record: PhantomData<fn() -> T>,
}

impl<'a, T> Paginator<'a, T>
where
    T: DeserializeOwned,
{
    pub fn new(
        source: &'a dyn ActivitySource,
        project: ProjectId,
        endpoint: Endpoint,
        per_page: u32,
    ) -> Self {
        Self {
            source,
            project,
            endpoint,
            next: Some(PageRequest::first(per_page.max(1))),
            _record: PhantomData,
        }
    }

    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>, SourceError> {
        // Stop after an error; the walk is not resumable.
        let Some(request) = self.next.take() else {
            return Ok(None);
        };
        let fetched = self
            .source
            .fetch_page(self.project, &self.endpoint, request)
            .await?;
        let records = fetched
            .items
            .into_iter()
            .map(serde_json::from_value::<T>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| SourceError::Decode {
                operation: self.endpoint.label().to_string(),
                message: error.to_string(),
            })?;
        // A token that does not advance would loop forever.
        self.next = fetched
            .next_page
            .filter(|next| *next > request.page)
            .map(|page| PageRequest {
                page,
                per_page: request.per_page,
            });
        Ok(Some(records))
    }

    /// Drains every remaining page.
    pub async fn collect_all(mut self) -> Result<Vec<T>, SourceError> {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await? {
            records.extend(page);
        }
        Ok(records)
    }
}
