// file: src/server/mod.rs
// description: actix-web application state, routing and server startup
// reference: https://actix.rs/docs/application

mod errors;
mod handlers;
mod upload;

use crate::config::Config;
use crate::database::VectorStore;
use crate::error::{PipelineError, Result};
use crate::pipeline::{DocumentProcessor, RagPipeline};
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, error, web};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub use handlers::AnswerRequest;
pub use upload::{FILE_FIELD, SpooledUpload, spool_file_field};

pub struct AppState {
    pub processor: Arc<DocumentProcessor>,
    pub rag: Arc<RagPipeline>,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn new(config: &Config, processor: Arc<DocumentProcessor>, rag: Arc<RagPipeline>) -> Self {
        Self {
            processor,
            rag,
            upload_dir: config.server.upload_dir.clone(),
            max_upload_bytes: config.max_upload_bytes(),
        }
    }

    fn require_store(&self) -> Result<&Arc<dyn VectorStore>> {
        self.processor.store().ok_or_else(|| {
            PipelineError::Unavailable("vector persistence is disabled".to_string())
        })
    }
}

/// Registers every route; shared by the server and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let response = errors::bad_request(err.to_string());
        error::InternalError::from_response(err, response).into()
    });

    cfg.app_data(json_config)
        .route("/upload/excel", web::post().to(handlers::upload_excel))
        .route("/upload/pdf", web::post().to(handlers::upload_pdf))
        .route("/upload/document", web::post().to(handlers::upload_document))
        .route("/upload/all", web::post().to(handlers::upload_all))
        .route("/index", web::post().to(handlers::index_document))
        .route(
            "/retrieve_and_answer",
            web::post().to(handlers::retrieve_and_answer),
        )
        .route("/documents/{id}", web::get().to(handlers::get_document))
        .route("/documents/{id}", web::delete().to(handlers::delete_document))
        .route("/health", web::get().to(handlers::health));
}

pub async fn run_server(config: &Config, state: AppState) -> std::io::Result<()> {
    let address = (config.server.host.clone(), config.server.port);
    let state = web::Data::new(state);

    info!(
        "Starting HTTP server on http://{}:{}",
        config.server.host, config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(address)?
    .run()
    .await
}
