use crate::errors::StudioError;
use crate::models::document::{DocumentVersion, VersionId};

/// In-memory document history.
///
/// Append-only: entries are never removed or rewritten. Reverting only moves
/// the `current` pointer, so later entries survive a revert. Ids are
/// contiguous from 1 and `current` always names an existing entry.
#[derive(Debug, Clone)]
pub struct VersionHistory {
    versions: Vec<DocumentVersion>,
    current: VersionId,
}

impl VersionHistory {
    /// Starts a history whose only entry is version 1.
    pub fn new(content: String) -> Self {
        Self {
            versions: vec![DocumentVersion {
                id: VersionId::FIRST,
                content,
            }],
            current: VersionId::FIRST,
        }
    }

    pub fn current(&self) -> &DocumentVersion {
        // `current` is only ever set to an id that `get` resolves.
        &self.versions[self.current.get() as usize - 1]
    }

    pub fn current_id(&self) -> VersionId {
        self.current
    }

    pub fn latest_id(&self) -> VersionId {
        self.versions
            .last()
            .map(|v| v.id)
            .unwrap_or(VersionId::FIRST)
    }

    pub fn get(&self, id: VersionId) -> Option<&DocumentVersion> {
        let index = (id.get() as usize).checked_sub(1)?;
        self.versions.get(index)
    }

    pub fn contains(&self, id: VersionId) -> bool {
        self.get(id).is_some()
    }

    /// Appends a new entry after the latest one and makes it current.
    /// After a revert this still appends at the end, never in the middle.
    pub fn append(&mut self, content: String) -> VersionId {
        let id = self.latest_id().next();
        self.versions.push(DocumentVersion { id, content });
        self.current = id;
        id
    }

    /// Points `current` at an existing entry without touching the entries.
    pub fn set_current(&mut self, id: VersionId) -> Result<&DocumentVersion, StudioError> {
        if !self.contains(id) {
            return Err(StudioError::NotFound(format!(
                "Version {id} is not in the history"
            )));
        }
        self.current = id;
        Ok(self.current())
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentVersion> {
        self.versions.iter()
    }
}
