//! Axum route handlers for document generation.

use std::collections::BTreeMap;

use anyhow::Context;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;
use tracing::info;

use crate::docx::TemplateDoc;
use crate::errors::AppError;
use crate::generate::templates::{list_templates, resolve_template, TemplateInfo};
use crate::state::AppState;
use crate::substitute::{apply_replacements, ReplacementMap};

const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const DOWNLOAD_FILENAME: &str = "customized.docx";

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub template_name: Option<String>,
    /// Session token; checked only when auth gating is enabled.
    pub token: Option<String>,
    /// Every remaining field becomes a replacement value.
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

/// GET /api/v1/templates
///
/// Lists the templates available for generation.
pub async fn handle_list_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<TemplateInfo>>, AppError> {
    let templates = list_templates(&state.config.template_dir)
        .context("listing template directory")
        .map_err(AppError::Internal)?;
    Ok(Json(templates))
}

/// POST /api/v1/generate
///
/// Fills one template with the submitted fields and streams the result back
/// as a download. Control fields (`template_name`, `token`) never reach the
/// replacement map. Either the fully substituted document is returned or an
/// error status — never a partial file.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Response, AppError> {
    if state.config.auth_password.is_some() {
        let token = request.token.as_deref().unwrap_or_default();
        if !state.sessions.validate(token) {
            return Err(AppError::Unauthorized);
        }
    }

    let template_name = request.template_name.as_deref().unwrap_or_default();
    let path = resolve_template(&state.config.template_dir, template_name)?;

    let template_bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("reading template {}", path.display()))
        .map_err(AppError::Internal)?;

    let replacements: ReplacementMap = request.fields;
    let mut template = TemplateDoc::load(&template_bytes)?;
    apply_replacements(&mut template.document, &replacements);
    let output = template.save()?;

    info!(
        template = template_name,
        fields = replacements.len(),
        bytes = output.len(),
        "generated document"
    );

    let headers = [
        (header::CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{DOWNLOAD_FILENAME}\""),
        ),
    ];
    Ok((headers, Bytes::from(output)).into_response())
}
