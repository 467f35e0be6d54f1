use std::collections::{BTreeMap, BTreeSet};

use vigil_gitlab::{AccessLevel, ActivitySource, Endpoint, ProjectId, ProjectMember, SourceError};

use crate::{normalize_handle, Paginator};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Normalized handles of privileged members, plus their numeric user ids
/// where the host reported one.
pub struct PrivilegedAccounts {
    handles: BTreeSet<String>,
    by_id: BTreeMap<u64, String>,
}

impl PrivilegedAccounts {
    pub fn handles(&self) -> &BTreeSet<String> {
        &self.handles
    }

    pub fn handle_for_id(&self, user_id: u64) -> Option<&str> {
        self.by_id.get(&user_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    fn admit(&mut self, member: ProjectMember) {
        let Some(handle) = normalize_handle(&member.username) else {
            return;
        };
        if let Some(user_id) = member.id {
            self.by_id.insert(user_id, handle.clone());
        }
        self.handles.insert(handle);
    }
}

/// Lists direct and inherited members and keeps the normalized handles at or
/// above `min_access_level`.
///
/// Any page failure aborts resolution: a partial privileged set would make
/// every later conclusion meaningless.
pub async fn resolve_privileged_accounts(
    source: &dyn ActivitySource,
    project: ProjectId,
    min_access_level: AccessLevel,
    page_size: u32,
) -> Result<PrivilegedAccounts, SourceError> {
    let mut members =
        Paginator::<ProjectMember>::new(source, project, Endpoint::ProjectMembers, page_size);
    let mut accounts = PrivilegedAccounts::default();
    let mut scanned = 0_usize;
    while let Some(page) = members.next_page().await? {
        scanned = scanned.saturating_add(page.len());
        page.into_iter()
            .filter(|member| min_access_level.admits(member.access_level))
            .for_each(|member| accounts.admit(member));
    }
    tracing::debug!(
        project = project.0,
        min_access_level = min_access_level.as_str(),
        scanned,
        elevated = accounts.len(),
        "resolved privileged accounts"
    );
    Ok(accounts)
}
