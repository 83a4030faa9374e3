//! Backend contract. Every network call goes through this trait.
//!
//! The session never talks HTTP directly; it goes through `Backend`, which
//! `HttpBackend` implements against the Typst endpoints and `MockBackend`
//! implements with scripted responses for tests.

use async_trait::async_trait;

use crate::errors::StudioError;
use crate::models::chat::ChatTurn;
use crate::models::preview::{Artifact, PreviewFormat};
use crate::models::template::TemplateSummary;
use crate::models::upload::Upload;

pub mod http;
#[cfg(test)]
pub mod mock;
pub mod wire;

pub use http::HttpBackend;

/// Result of a modification request. The markup may equal the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub markup: String,
    /// Conversational reply, when the backend sends one.
    pub reply: Option<String>,
}

/// The external resume backend. Implementations are stateless from the
/// session's point of view; every call is one request/response cycle.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, StudioError>;

    async fn template_markup(&self, filename: &str) -> Result<String, StudioError>;

    /// Extracts the uploaded document and lays it out with the template.
    async fn generate(&self, upload: &Upload, template_id: u32) -> Result<String, StudioError>;

    /// Renders markup into an artifact of the requested format.
    async fn compile(&self, markup: &str, format: PreviewFormat) -> Result<Artifact, StudioError>;

    async fn modify(
        &self,
        markup: &str,
        prompt: &str,
        history: &[ChatTurn],
    ) -> Result<Modification, StudioError>;
}
