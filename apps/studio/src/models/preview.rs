use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bytes::Bytes;

use crate::errors::StudioError;
use crate::models::document::VersionId;

/// Output format requested from `/compile-typst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewFormat {
    Svg,
    Pdf,
}

impl PreviewFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            PreviewFormat::Svg => "svg",
            PreviewFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for PreviewFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreviewFormat {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(PreviewFormat::Svg),
            "pdf" => Ok(PreviewFormat::Pdf),
            other => Err(StudioError::Validation(format!(
                "unknown preview format '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgPage {
    pub filename: String,
    pub bytes: Bytes,
}

/// A rendered artifact as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Svg { basename: String, pages: Vec<SvgPage> },
    Pdf(Bytes),
}

impl Artifact {
    /// Short human-readable summary, e.g. `2 SVG page(s) (resume-a12813f8)`.
    pub fn describe(&self) -> String {
        match self {
            Artifact::Svg { basename, pages } => {
                format!("{} SVG page(s) ({basename})", pages.len())
            }
            Artifact::Pdf(bytes) => format!("PDF, {} bytes", bytes.len()),
        }
    }
}

/// The artifact currently on display, tagged with the version it renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub version: VersionId,
    pub artifact: Artifact,
}

impl Preview {
    /// Writes the artifact into `dir` after removing every file an earlier
    /// preview left there. Returns the written paths in page order.
    ///
    /// `dir` is owned by the preview: SVG basenames change on every compile,
    /// so old pages would otherwise pile up next to the current ones.
    pub async fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, StudioError> {
        tokio::fs::create_dir_all(dir).await?;
        clear_files(dir).await?;

        let mut written = Vec::new();
        match &self.artifact {
            Artifact::Svg { pages, .. } => {
                for page in pages {
                    // Page names come from the server; keep only the final component.
                    let name = Path::new(&page.filename)
                        .file_name()
                        .ok_or_else(|| {
                            StudioError::Validation(format!(
                                "invalid page filename '{}'",
                                page.filename
                            ))
                        })?;
                    let path = dir.join(name);
                    tokio::fs::write(&path, &page.bytes).await?;
                    written.push(path);
                }
            }
            Artifact::Pdf(bytes) => {
                let path = dir.join("preview.pdf");
                tokio::fs::write(&path, bytes).await?;
                written.push(path);
            }
        }
        Ok(written)
    }
}

async fn clear_files(dir: &Path) -> Result<(), StudioError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            tokio::fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}

/// Download name for an exported resume, derived from the template name.
///
/// The name comes from the server, so anything that could act as a path
/// separator or parent reference is flattened to `-`.
pub fn export_file_name(template_name: Option<&str>) -> String {
    let name = template_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Custom");
    let name: String = name
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();
    format!("Resume-{}.pdf", name.replace("..", "-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_file_name_uses_template_name() {
        assert_eq!(
            export_file_name(Some("Modern Minimal")),
            "Resume-Modern-Minimal.pdf"
        );
    }

    #[test]
    fn test_export_file_name_falls_back_to_custom() {
        assert_eq!(export_file_name(None), "Resume-Custom.pdf");
        assert_eq!(export_file_name(Some("  ")), "Resume-Custom.pdf");
    }

    #[test]
    fn test_export_file_name_flattens_path_characters() {
        assert_eq!(
            export_file_name(Some("Modern/Classic")),
            "Resume-Modern-Classic.pdf"
        );
        assert_eq!(export_file_name(Some("..\\x")), "Resume---x.pdf");
        let name = export_file_name(Some("../../etc/passwd"));
        assert_eq!(Path::new(&name).file_name().unwrap(), name.as_str());
        assert!(!name.contains(".."));
    }

    #[test]
    fn test_preview_format_parse() {
        assert_eq!("SVG".parse::<PreviewFormat>().unwrap(), PreviewFormat::Svg);
        assert_eq!("pdf".parse::<PreviewFormat>().unwrap(), PreviewFormat::Pdf);
        assert!("png".parse::<PreviewFormat>().is_err());
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            Artifact::Pdf(Bytes::from_static(b"%PDF")).describe(),
            "PDF, 4 bytes"
        );
    }

    #[tokio::test]
    async fn test_write_svg_pages_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let preview = Preview {
            version: VersionId::FIRST,
            artifact: Artifact::Svg {
                basename: "resume-1a2b".to_string(),
                pages: vec![
                    SvgPage {
                        filename: "resume-1a2b-1.svg".to_string(),
                        bytes: Bytes::from_static(b"<svg/>"),
                    },
                    SvgPage {
                        filename: "../resume-1a2b-2.svg".to_string(),
                        bytes: Bytes::from_static(b"<svg/>"),
                    },
                ],
            },
        };

        let written = preview.write_to(dir.path()).await.unwrap();
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|p| p.parent() == Some(dir.path())));
        assert!(dir.path().join("resume-1a2b-2.svg").exists());
    }

    #[tokio::test]
    async fn test_write_replaces_earlier_preview_files() {
        let dir = tempfile::tempdir().unwrap();
        let page = |name: &str| SvgPage {
            filename: name.to_string(),
            bytes: Bytes::from_static(b"<svg/>"),
        };
        let first = Preview {
            version: VersionId::FIRST,
            artifact: Artifact::Svg {
                basename: "resume-aaaa".to_string(),
                pages: vec![page("resume-aaaa-1.svg"), page("resume-aaaa-2.svg")],
            },
        };
        let second = Preview {
            version: VersionId::FIRST.next(),
            artifact: Artifact::Svg {
                basename: "resume-bbbb".to_string(),
                pages: vec![page("resume-bbbb-1.svg")],
            },
        };

        first.write_to(dir.path()).await.unwrap();
        second.write_to(dir.path()).await.unwrap();

        let mut names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["resume-bbbb-1.svg"]);
    }
}
