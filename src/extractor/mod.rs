// file: src/extractor/mod.rs
// description: file-format dispatch and text extraction entry points
// reference: internal module structure

pub mod docx;
pub mod excel;
pub mod pdf;
pub mod text;

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

pub use excel::ExcelLayout;

/// Supported upload formats, resolved from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Docx,
    Xlsx,
    Txt,
}

impl FileKind {
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        extension
            .as_deref()
            .and_then(Self::from_extension)
            .ok_or_else(|| PipelineError::UnsupportedFormat(file_name.to_string()))
    }

    /// Matches a lowercase extension without the leading dot.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "pdf" => Some(FileKind::Pdf),
            "docx" => Some(FileKind::Docx),
            "xlsx" => Some(FileKind::Xlsx),
            "txt" => Some(FileKind::Txt),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Docx => "docx",
            FileKind::Xlsx => "xlsx",
            FileKind::Txt => "txt",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Upload endpoints and the formats each one accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadRoute {
    Excel,
    Pdf,
    Document,
    All,
}

impl UploadRoute {
    pub fn accepts(&self, kind: FileKind) -> bool {
        match self {
            UploadRoute::Excel => kind == FileKind::Xlsx,
            UploadRoute::Pdf => kind == FileKind::Pdf,
            UploadRoute::Document => matches!(kind, FileKind::Txt | FileKind::Docx),
            UploadRoute::All => true,
        }
    }

    /// Prefix used when deriving document ids for uploads on this route.
    pub fn label(&self) -> &'static str {
        match self {
            UploadRoute::Excel => "excel",
            UploadRoute::Pdf => "pdf",
            UploadRoute::Document => "document",
            UploadRoute::All => "all",
        }
    }

    /// Resolves the kind of `file_name` and checks this route accepts it.
    pub fn resolve(&self, file_name: &str) -> Result<FileKind> {
        let kind = FileKind::from_file_name(file_name)?;
        if !self.accepts(kind) {
            return Err(PipelineError::UnsupportedFormat(format!(
                "{} is not accepted by the {} upload",
                file_name,
                self.label()
            )));
        }
        Ok(kind)
    }
}

#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub kind: FileKind,
    pub text: String,
    /// Natural units for chunking: paragraphs, rows, or the whole text.
    pub segments: Vec<String>,
}

impl ExtractedText {
    pub fn whole(kind: FileKind, text: String) -> Self {
        let segments = if text.trim().is_empty() {
            Vec::new()
        } else {
            vec![text.clone()]
        };
        Self {
            kind,
            text,
            segments,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

pub fn extract_bytes(kind: FileKind, bytes: &[u8], layout: ExcelLayout) -> Result<ExtractedText> {
    debug!("Extracting {} bytes as {}", bytes.len(), kind);

    match kind {
        FileKind::Pdf => pdf::extract(bytes),
        FileKind::Docx => docx::extract(bytes),
        FileKind::Xlsx => excel::extract(bytes, layout),
        FileKind::Txt => Ok(text::extract(bytes)),
    }
}

/// Reads `path` and extracts it according to its extension. Parsing runs on
/// the blocking pool since the format crates are synchronous.
pub async fn extract_path(path: &Path, layout: ExcelLayout) -> Result<ExtractedText> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PipelineError::Validation(format!("Invalid path: {}", path.display())))?;
    let kind = FileKind::from_file_name(file_name)?;
    extract_path_as(path, kind, layout).await
}

/// Like [`extract_path`] but with the kind already resolved, for spooled
/// uploads whose temp names carry no meaningful extension.
pub async fn extract_path_as(
    path: &Path,
    kind: FileKind,
    layout: ExcelLayout,
) -> Result<ExtractedText> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| PipelineError::FileOperation {
            path: path.to_path_buf(),
            source,
        })?;

    tokio::task::spawn_blocking(move || extract_bytes(kind, &bytes, layout))
        .await
        .map_err(|e| PipelineError::Extraction(format!("Extraction task failed: {}", e)))?
}
