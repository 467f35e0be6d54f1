//! Per-source adapters to the `(actor, timestamp)` pair the cascade consumes.

use chrono::{DateTime, Utc};
use vigil_gitlab::{
    AuditEvent, AwardEmoji, Job, MergeRequest, PipelineSchedule, ProjectEvent, Release,
    ResourceEvent, UserRef,
};

/// A record that can attribute activity to an account at an instant.
pub trait ActivityRecord {
    fn actor(&self) -> Option<&str>;
    fn occurred_at(&self) -> Option<DateTime<Utc>>;
}

/// Actor and timestamp of `record` when both are present and the timestamp
/// is strictly after `cutoff`.
pub fn recent_activity<R>(record: &R, cutoff: DateTime<Utc>) -> Option<(&str, DateTime<Utc>)>
where
    R: ActivityRecord + ?Sized,
{
    let actor = record.actor().map(str::trim).filter(|actor| !actor.is_empty())?;
    let occurred_at = record.occurred_at().filter(|at| *at > cutoff)?;
    Some((actor, occurred_at))
}

fn handle_of(user: &Option<UserRef>) -> Option<&str> {
    user.as_ref().and_then(UserRef::handle)
}

impl ActivityRecord for MergeRequest {
    fn actor(&self) -> Option<&str> {
        handle_of(&self.merged_by)
    }

    fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.merged_at
    }
}

impl ActivityRecord for Release {
    fn actor(&self) -> Option<&str> {
        handle_of(&self.author)
    }

    fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.released_at.or(self.created_at)
    }
}

impl ActivityRecord for AwardEmoji {
    fn actor(&self) -> Option<&str> {
        handle_of(&self.user)
    }

    fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.updated_at)
    }
}

/// Only the username; `author_name` is a free-form display name.
impl ActivityRecord for AuditEvent {
    fn actor(&self) -> Option<&str> {
        self.details.author_username.as_deref()
    }

    fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl ActivityRecord for Job {
    fn actor(&self) -> Option<&str> {
        handle_of(&self.user)
    }

    fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.started_at.or(self.finished_at).or(self.created_at)
    }
}

impl ActivityRecord for PipelineSchedule {
    fn actor(&self) -> Option<&str> {
        handle_of(&self.owner)
    }

    fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

impl ActivityRecord for ProjectEvent {
    fn actor(&self) -> Option<&str> {
        self.author_username
            .as_deref()
            .or_else(|| handle_of(&self.author))
    }

    fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl ActivityRecord for ResourceEvent {
    fn actor(&self) -> Option<&str> {
        handle_of(&self.user)
    }

    fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}
