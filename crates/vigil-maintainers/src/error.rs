use std::sync::Arc;

use thiserror::Error;
use vigil_gitlab::SourceError;

use crate::SignalStep;

#[derive(Debug, Clone, Error)]
/// Fatal setup failures. Cloneable so one cached outcome can be handed to
/// every caller of the handler.
pub enum ActivityError {
    #[error("resolve project id '{project}': {source}")]
    ResolveProject {
        project: String,
        #[source]
        source: Arc<SourceError>,
    },
    #[error("load members: {source}")]
    LoadMembers {
        #[source]
        source: Arc<SourceError>,
    },
    #[error("collect activity ({step}): {source}")]
    CollectActivity {
        step: SignalStep,
        #[source]
        source: Arc<SourceError>,
    },
}

impl ActivityError {
    /// Setup phase that failed.
    pub fn phase(&self) -> &'static str {
        match self {
            ActivityError::ResolveProject { .. } => "resolve project id",
            ActivityError::LoadMembers { .. } => "load members",
            ActivityError::CollectActivity { .. } => "collect activity",
        }
    }

    pub fn source_error(&self) -> &SourceError {
        match self {
            ActivityError::ResolveProject { source, .. }
            | ActivityError::LoadMembers { source }
            | ActivityError::CollectActivity { source, .. } => source.as_ref(),
        }
    }
}
