use std::fmt;

use serde::Serialize;

/// Identifier of a document version. Ids start at 1 and are contiguous.
///
/// Only the version history mints new ids, so a `VersionId` held anywhere else
/// always refers to an entry that was appended at some point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct VersionId(u32);

impl VersionId {
    pub const FIRST: VersionId = VersionId(1);

    pub fn get(self) -> u32 {
        self.0
    }

    pub(crate) fn next(self) -> VersionId {
        VersionId(self.0 + 1)
    }

    /// The id one step back, or `None` at the first version.
    pub fn previous(self) -> Option<VersionId> {
        (self.0 > 1).then(|| VersionId(self.0 - 1))
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A snapshot of the markup source at one point in the edit history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentVersion {
    pub id: VersionId,
    pub content: String,
}
