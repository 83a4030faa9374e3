// Client-side data model: everything the session holds in memory.
// Nothing here is persisted; state is discarded when the process exits.

pub mod chat;
pub mod document;
pub mod preview;
pub mod template;
pub mod upload;
