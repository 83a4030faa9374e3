use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::backend::wire::{
    CompileSvgResponse, ErrorBody, ModifyRequest, ModifyResponse, ProcessResponse, SvgPageList,
    TemplateList,
};
use crate::backend::{Backend, Modification};
use crate::errors::StudioError;
use crate::models::chat::ChatTurn;
use crate::models::preview::{Artifact, PreviewFormat, SvgPage};
use crate::models::template::TemplateSummary;
use crate::models::upload::Upload;

const GENERATE_FALLBACK_ERROR: &str = "Failed to generate Typst resume";
const MODIFY_FALLBACK_ERROR: &str = "Sorry, I couldn't process that.";

/// reqwest client for the Typst backend.
///
/// No retries: a failed call is reported once and the user decides whether
/// to try again. The whole request, body included, is bounded by `timeout`.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StudioError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn list_svg_pages(&self, basename: &str) -> Result<Vec<String>, StudioError> {
        let response = self
            .client
            .get(self.url("/list-svg-pages"))
            .query(&[("basename", basename)])
            .send()
            .await?;
        let list: SvgPageList = read_json(response).await?;
        Ok(list.pages)
    }

    async fn svg_page(&self, filename: &str) -> Result<SvgPage, StudioError> {
        let response = self
            .client
            .get(self.url("/get-svg-page"))
            .query(&[("filename", filename)])
            .send()
            .await?;
        let bytes = check(response).await?.bytes().await?;
        Ok(SvgPage {
            filename: filename.to_string(),
            bytes,
        })
    }
}

/// Passes 2xx responses through; turns anything else into a `Backend` error
/// carrying the server's `detail` message when it sent one.
async fn check(response: Response) -> Result<Response, StudioError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("Backend returned {}: {}", status, body);
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.message())
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("Request failed with status {status}")
            } else {
                body
            }
        });
    Err(StudioError::Backend(message))
}

/// Reads a checked response body as JSON. Decoding goes through `serde_json`
/// so a malformed payload surfaces as a parse error rather than a transport one.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, StudioError> {
    let body = check(response).await?.text().await?;
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, StudioError> {
        let response = self.client.get(self.url("/templates")).send().await?;
        let list: TemplateList = read_json(response).await?;
        debug!("Fetched {} templates", list.templates.len());
        Ok(list.templates)
    }

    async fn template_markup(&self, filename: &str) -> Result<String, StudioError> {
        let response = self
            .client
            .get(self.url("/templates/get-raw-code"))
            .query(&[("filename", filename)])
            .send()
            .await?;
        Ok(check(response).await?.text().await?)
    }

    async fn generate(&self, upload: &Upload, template_id: u32) -> Result<String, StudioError> {
        let file = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name.clone())
            .mime_str(upload.mime)?;
        let form = Form::new()
            .part("file", file)
            .text("template_id", template_id.to_string());

        info!(
            "Generating resume from '{}' ({} bytes) with template {}",
            upload.file_name,
            upload.bytes.len(),
            template_id
        );

        let response = self
            .client
            .post(self.url("/process_typst"))
            // The server reads `template_id` from the query string; the form
            // field is kept for backends that read it from the body.
            .query(&[("template_id", template_id)])
            .multipart(form)
            .send()
            .await?;
        let parsed: ProcessResponse = read_json(response).await?;

        match parsed.typst_resume {
            Some(markup) if parsed.success && !markup.trim().is_empty() => Ok(markup),
            _ => Err(StudioError::Backend(
                parsed
                    .error
                    .unwrap_or_else(|| GENERATE_FALLBACK_ERROR.to_string()),
            )),
        }
    }

    async fn compile(&self, markup: &str, format: PreviewFormat) -> Result<Artifact, StudioError> {
        let form = Form::new()
            .text("content", markup.to_string())
            .text("format", format.as_str());

        let response = self
            .client
            .post(self.url("/compile-typst"))
            .multipart(form)
            .send()
            .await?;
        match format {
            PreviewFormat::Pdf => {
                let bytes = check(response).await?.bytes().await?;
                debug!("Compiled PDF: {} bytes", bytes.len());
                Ok(Artifact::Pdf(bytes))
            }
            PreviewFormat::Svg => {
                let compiled: CompileSvgResponse = read_json(response).await?;
                let names = self.list_svg_pages(&compiled.basename).await?;
                let mut pages = Vec::with_capacity(names.len());
                for name in &names {
                    pages.push(self.svg_page(name).await?);
                }
                debug!(
                    "Compiled SVG '{}': {} pages",
                    compiled.basename,
                    pages.len()
                );
                Ok(Artifact::Svg {
                    basename: compiled.basename,
                    pages,
                })
            }
        }
    }

    async fn modify(
        &self,
        markup: &str,
        prompt: &str,
        history: &[ChatTurn],
    ) -> Result<Modification, StudioError> {
        let request = ModifyRequest {
            typst_code: markup,
            prompt,
            history,
        };

        let response = self
            .client
            .post(self.url("/modify-typst"))
            .json(&request)
            .send()
            .await?;
        let parsed: ModifyResponse = read_json(response).await?;

        match parsed.modified_typst {
            Some(markup) if parsed.success => Ok(Modification {
                markup,
                reply: parsed.reply_text.filter(|r| !r.trim().is_empty()),
            }),
            _ => Err(StudioError::Backend(
                parsed
                    .error
                    .unwrap_or_else(|| MODIFY_FALLBACK_ERROR.to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Role;
    use axum::{
        extract::{Multipart, Query},
        http::{header, StatusCode},
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn templates() -> Json<Value> {
        Json(json!({
            "templates": [
                {"id": 1, "name": "Modern Minimal", "filename": "1.typ"},
                {"id": 2, "name": "Executive Serif", "filename": "2.typ", "description": "Traditional"}
            ]
        }))
    }

    async fn raw_code(Query(q): Query<HashMap<String, String>>) -> impl IntoResponse {
        match q.get("filename").map(String::as_str) {
            Some("1.typ") => (StatusCode::OK, "#set page(margin: 1in)".to_string()),
            _ => (StatusCode::NOT_FOUND, "missing".to_string()),
        }
    }

    async fn read_form(mut multipart: Multipart) -> HashMap<String, (Option<String>, Vec<u8>)> {
        let mut fields = HashMap::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let data = field.bytes().await.unwrap().to_vec();
            fields.insert(name, (file_name, data));
        }
        fields
    }

    async fn process(
        Query(q): Query<HashMap<String, String>>,
        multipart: Multipart,
    ) -> Json<Value> {
        let fields = read_form(multipart).await;
        let template_id = q.get("template_id").cloned().unwrap_or_default();
        let form_id = String::from_utf8(fields["template_id"].1.clone()).unwrap();
        if template_id != form_id {
            return Json(json!({"success": false, "error": "template_id mismatch"}));
        }
        if template_id == "99" {
            return Json(json!({"success": false, "error": "Template 99 does not exist"}));
        }
        let (file_name, bytes) = &fields["file"];
        Json(json!({
            "success": true,
            "typst_resume": format!(
                "// template {template_id} from {}\n{}",
                file_name.clone().unwrap_or_default(),
                String::from_utf8_lossy(bytes)
            )
        }))
    }

    async fn compile(multipart: Multipart) -> axum::response::Response {
        let fields = read_form(multipart).await;
        let format = String::from_utf8(fields["format"].1.clone()).unwrap();
        let content = fields["content"].1.clone();
        if content.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": "Provide .typ file or content"})),
            )
                .into_response();
        }
        if format == "svg" {
            Json(json!({"success": true, "type": "svg", "basename": "resume-a12813f8"}))
                .into_response()
        } else {
            ([(header::CONTENT_TYPE, "application/pdf")], content).into_response()
        }
    }

    async fn list_pages(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
        let base = &q["basename"];
        Json(json!({"success": true, "pages": [format!("{base}-1.svg"), format!("{base}-2.svg")]}))
    }

    async fn svg_page(Query(q): Query<HashMap<String, String>>) -> String {
        format!("<svg id=\"{}\"/>", q["filename"])
    }

    async fn modify(Json(body): Json<Value>) -> axum::response::Response {
        let prompt = body["prompt"].as_str().unwrap_or_default();
        if prompt == "explode" {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "Modification failed"})),
            )
                .into_response();
        }
        let code = body["typst_code"].as_str().unwrap_or_default();
        let turns = body["history"].as_array().map(Vec::len).unwrap_or(0);
        Json(json!({
            "success": true,
            "modified_typst": format!("{code}\n// {prompt}"),
            "reply_text": format!("Applied with {turns} turns of context")
        }))
        .into_response()
    }

    async fn spawn_backend() -> HttpBackend {
        let app = Router::new()
            .route("/templates", get(templates))
            .route("/templates/get-raw-code", get(raw_code))
            .route("/process_typst", post(process))
            .route("/compile-typst", post(compile))
            .route("/list-svg-pages", get(list_pages))
            .route("/get-svg-page", get(svg_page))
            .route("/modify-typst", post(modify));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        HttpBackend::new(&format!("http://{addr}/"), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_list_templates_defaults_missing_description() {
        let backend = spawn_backend().await;
        let list = backend.list_templates().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "Modern Minimal");
        assert_eq!(list[0].description, "");
        assert_eq!(list[1].description, "Traditional");
    }

    #[tokio::test]
    async fn test_template_markup_and_not_found() {
        let backend = spawn_backend().await;
        assert_eq!(
            backend.template_markup("1.typ").await.unwrap(),
            "#set page(margin: 1in)"
        );
        let err = backend.template_markup("9.typ").await.unwrap_err();
        assert!(matches!(err, StudioError::Backend(ref m) if m == "missing"));
    }

    #[tokio::test]
    async fn test_generate_sends_template_in_query_and_form() {
        let backend = spawn_backend().await;
        let upload = Upload::new("jane.pdf", b"Jane Doe".to_vec());
        let markup = backend.generate(&upload, 3).await.unwrap();
        assert_eq!(markup, "// template 3 from jane.pdf\nJane Doe");
    }

    #[tokio::test]
    async fn test_generate_surfaces_server_error_verbatim() {
        let backend = spawn_backend().await;
        let upload = Upload::new("jane.pdf", b"Jane Doe".to_vec());
        let err = backend.generate(&upload, 99).await.unwrap_err();
        assert_eq!(err.notice().message, "Template 99 does not exist");
    }

    #[tokio::test]
    async fn test_compile_svg_fetches_pages_in_order() {
        let backend = spawn_backend().await;
        let artifact = backend.compile("= Jane", PreviewFormat::Svg).await.unwrap();
        match artifact {
            Artifact::Svg { basename, pages } => {
                assert_eq!(basename, "resume-a12813f8");
                let names: Vec<_> = pages.iter().map(|p| p.filename.as_str()).collect();
                assert_eq!(names, ["resume-a12813f8-1.svg", "resume-a12813f8-2.svg"]);
                assert_eq!(&pages[0].bytes[..], b"<svg id=\"resume-a12813f8-1.svg\"/>");
            }
            other => panic!("expected svg, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_compile_pdf_returns_bytes() {
        let backend = spawn_backend().await;
        let artifact = backend.compile("= Jane", PreviewFormat::Pdf).await.unwrap();
        assert_eq!(artifact, Artifact::Pdf(bytes::Bytes::from_static(b"= Jane")));
    }

    #[tokio::test]
    async fn test_compile_error_detail_is_surfaced() {
        let backend = spawn_backend().await;
        let err = backend.compile("", PreviewFormat::Pdf).await.unwrap_err();
        assert_eq!(err.notice().message, "Provide .typ file or content");
    }

    #[tokio::test]
    async fn test_modify_sends_history_and_reads_reply() {
        let backend = spawn_backend().await;
        let history = vec![
            ChatTurn {
                role: Role::Ai,
                content: "Generated".to_string(),
            },
            ChatTurn {
                role: Role::User,
                content: "bold name".to_string(),
            },
        ];
        let modification = backend.modify("= Jane", "bold name", &history).await.unwrap();
        assert_eq!(modification.markup, "= Jane\n// bold name");
        assert_eq!(
            modification.reply.as_deref(),
            Some("Applied with 2 turns of context")
        );
    }

    #[tokio::test]
    async fn test_modify_http_error_uses_detail() {
        let backend = spawn_backend().await;
        let err = backend.modify("= Jane", "explode", &[]).await.unwrap_err();
        assert!(matches!(err, StudioError::Backend(ref m) if m == "Modification failed"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let backend =
            HttpBackend::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = backend.list_templates().await.unwrap_err();
        assert!(matches!(err, StudioError::Http(_)));
    }
}
