// file: src/server/upload.rs
// description: streams the multipart `file` field into a size-limited temp file
// reference: https://docs.rs/actix-multipart

use crate::error::{PipelineError, Result};
use actix_multipart::{Field, Multipart, MultipartError};
use futures::TryStreamExt;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub const FILE_FIELD: &str = "file";

pub struct SpooledUpload {
    /// Name the client sent, not yet validated.
    pub file_name: String,
    pub file: NamedTempFile,
    pub size: u64,
}

fn too_large(max_bytes: u64) -> PipelineError {
    PipelineError::PayloadTooLarge {
        limit_mb: (max_bytes / 1_048_576) as usize,
    }
}

/// Reads the multipart body until the `file` field and spools it into
/// `upload_dir`. Other fields are drained and ignored, but their bytes count
/// against `max_bytes` too.
pub async fn spool_file_field(
    mut payload: Multipart,
    upload_dir: &Path,
    max_bytes: u64,
) -> Result<SpooledUpload> {
    let mut drained: u64 = 0;
    while let Some(field) = payload.try_next().await.map_err(malformed)? {
        let is_file = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .is_some_and(|name| name == FILE_FIELD);

        if !is_file {
            drain(field, &mut drained, max_bytes).await?;
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        if file_name.trim().is_empty() {
            return Err(PipelineError::EmptyFileName);
        }

        return spool_field(field, file_name, upload_dir, drained, max_bytes).await;
    }

    Err(PipelineError::MissingFile)
}

async fn spool_field(
    mut field: Field,
    file_name: String,
    upload_dir: &Path,
    already_read: u64,
    max_bytes: u64,
) -> Result<SpooledUpload> {
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|source| PipelineError::FileOperation {
            path: upload_dir.to_path_buf(),
            source,
        })?;

    // Dropping `file` on any early return deletes it.
    let file = tempfile::Builder::new()
        .prefix("upload-")
        .tempfile_in(upload_dir)?;
    let mut writer = tokio::fs::File::from_std(file.as_file().try_clone()?);
    let mut size: u64 = 0;

    while let Some(chunk) = field.try_next().await.map_err(malformed)? {
        size += chunk.len() as u64;
        if already_read + size > max_bytes {
            return Err(too_large(max_bytes));
        }
        writer.write_all(&chunk).await?;
    }
    writer.flush().await?;

    debug!("Spooled {} ({} bytes) to {}", file_name, size, file.path().display());
    Ok(SpooledUpload {
        file_name,
        file,
        size,
    })
}

async fn drain(mut field: Field, drained: &mut u64, max_bytes: u64) -> Result<()> {
    while let Some(chunk) = field.try_next().await.map_err(malformed)? {
        *drained += chunk.len() as u64;
        if *drained > max_bytes {
            return Err(too_large(max_bytes));
        }
    }
    Ok(())
}

fn malformed(err: MultipartError) -> PipelineError {
    match err {
        // not a multipart request at all, so there is no file part
        MultipartError::ContentTypeMissing
        | MultipartError::ContentTypeParse
        | MultipartError::ContentTypeIncompatible
        | MultipartError::BoundaryMissing => PipelineError::MissingFile,
        other => PipelineError::Validation(format!("Malformed multipart body: {}", other)),
    }
}
