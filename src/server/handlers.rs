// file: src/server/handlers.rs
// description: request handlers for upload, index, answer and document routes
// reference: https://actix.rs/docs/handlers

use super::AppState;
use super::upload::spool_file_field;
use crate::error::PipelineError;
use crate::extractor::UploadRoute;
use crate::models::ProcessedDocument;
use crate::pipeline::close_temp;
use crate::utils::system_health;
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

type HandlerResult = Result<HttpResponse, PipelineError>;

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub query: String,
    pub top_k: Option<usize>,
}

async fn handle_upload(
    state: web::Data<AppState>,
    payload: Multipart,
    route: UploadRoute,
) -> Result<ProcessedDocument, PipelineError> {
    let upload = spool_file_field(payload, &state.upload_dir, state.max_upload_bytes).await?;
    info!(
        "Received {} upload {} ({} bytes)",
        route.label(),
        upload.file_name,
        upload.size
    );

    let result = state
        .processor
        .process_upload(route, &upload.file_name, upload.file.path())
        .await;
    close_temp(upload.file);
    result
}

pub async fn upload_excel(state: web::Data<AppState>, payload: Multipart) -> HandlerResult {
    let processed = handle_upload(state, payload, UploadRoute::Excel).await?;
    Ok(HttpResponse::Ok().json(processed))
}

pub async fn upload_pdf(state: web::Data<AppState>, payload: Multipart) -> HandlerResult {
    let processed = handle_upload(state, payload, UploadRoute::Pdf).await?;
    Ok(HttpResponse::Ok().json(processed))
}

pub async fn upload_document(state: web::Data<AppState>, payload: Multipart) -> HandlerResult {
    let processed = handle_upload(state, payload, UploadRoute::Document).await?;
    Ok(HttpResponse::Ok().json(processed))
}

pub async fn upload_all(state: web::Data<AppState>, payload: Multipart) -> HandlerResult {
    let processed = handle_upload(state, payload, UploadRoute::All).await?;
    Ok(HttpResponse::Ok().json(processed))
}

pub async fn index_document(state: web::Data<AppState>, payload: Multipart) -> HandlerResult {
    let upload = spool_file_field(payload, &state.upload_dir, state.max_upload_bytes).await?;
    let result = state
        .rag
        .index_document(&upload.file_name, upload.file.path())
        .await;
    close_temp(upload.file);

    Ok(HttpResponse::Ok().json(result?))
}

pub async fn retrieve_and_answer(
    state: web::Data<AppState>,
    request: web::Json<AnswerRequest>,
) -> HandlerResult {
    let answer = state.rag.answer(&request.query, request.top_k).await?;
    Ok(HttpResponse::Ok().json(answer))
}

pub async fn get_document(state: web::Data<AppState>, id: web::Path<String>) -> HandlerResult {
    let store = state.require_store()?;
    let record = store
        .get(&id)
        .await?
        .ok_or_else(|| PipelineError::NotFound(format!("document {}", id)))?;
    Ok(HttpResponse::Ok().json(record))
}

pub async fn delete_document(state: web::Data<AppState>, id: web::Path<String>) -> HandlerResult {
    let store = state.require_store()?;
    let deleted = store.delete(&id).await?;
    Ok(HttpResponse::Ok().json(json!({ "deleted": deleted })))
}

pub async fn health(state: web::Data<AppState>) -> HandlerResult {
    let report = system_health(
        state.processor.store(),
        state.processor.embedder(),
        state.rag.generator_model(),
        false,
    )
    .await;
    Ok(HttpResponse::Ok().json(report))
}
