//! Batch conversion endpoint: multipart in, one JSON summary out.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        multipart::{Field, MultipartError},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reelforge_core::{BatchError, DeliveryMode, ErrorKind, JobDescriptor, JobOutcome, TargetFormat};
use serde::Serialize;
use tracing::{info, warn};

use super::handlers::ErrorResponse;
use crate::metrics::{UPLOADED_BYTES_TOTAL, UPLOADED_FILES_TOTAL, UPLOADS_REJECTED_TOTAL};
use crate::state::AppState;

const DEFAULT_FORMAT: &str = "gif";
const DEFAULT_QUALITY: u8 = 80;
const DEFAULT_SCALE: u32 = 100;

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    /// True when every file converted.
    pub success: bool,
    pub results: Vec<ConvertedFile>,
    pub errors: Vec<FailedFile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedFile {
    pub name: String,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Inline payload as a `data:` URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FailedFile {
    pub name: String,
    pub error: String,
    pub kind: ErrorKind,
}

// ============================================================================
// Request parsing
// ============================================================================

/// Everything pulled out of the multipart body.
#[derive(Debug)]
struct BatchForm {
    files: Vec<(String, Bytes)>,
    format: String,
    quality: u8,
    scale: u32,
}

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn multipart_error(e: MultipartError) -> ApiError {
    UPLOADS_REJECTED_TOTAL
        .with_label_values(&["malformed"])
        .inc();
    error(e.status(), format!("Invalid upload: {}", e.body_text()))
}

/// Parses a non-negative whole number. Range checks belong to the converter,
/// which reports them per file.
fn parse_field(name: &str, text: &str) -> Result<u32, ApiError> {
    let text = text.trim();
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        // All digits, so the only possible failure is overflow.
        return Ok(text.parse().unwrap_or(u32::MAX));
    }
    UPLOADS_REJECTED_TOTAL
        .with_label_values(&["bad_parameter"])
        .inc();
    Err(error(
        StatusCode::BAD_REQUEST,
        format!("Invalid {}: {:?} is not a whole number", name, text),
    ))
}

/// Buffers one file part, giving up as soon as it grows past `max_bytes`.
async fn read_file(
    mut field: Field<'_>,
    file_name: &str,
    max_bytes: usize,
) -> Result<Bytes, ApiError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if data.len() + chunk.len() > max_bytes {
            UPLOADS_REJECTED_TOTAL
                .with_label_values(&["file_too_large"])
                .inc();
            return Err(error(
                StatusCode::BAD_REQUEST,
                format!(
                    "File too large: {} exceeds {} bytes",
                    if file_name.is_empty() { "upload" } else { file_name },
                    max_bytes
                ),
            ));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(data))
}

/// Per-request upload limits.
#[derive(Debug, Clone, Copy)]
struct UploadLimits {
    max_files: usize,
    max_file_bytes: usize,
}

/// Reads the form, refusing to buffer more than `max_files` files or any
/// file larger than `max_file_bytes`.
async fn read_form(multipart: &mut Multipart, limits: UploadLimits) -> Result<BatchForm, ApiError> {
    let mut form = BatchForm {
        files: Vec::new(),
        format: DEFAULT_FORMAT.to_string(),
        quality: DEFAULT_QUALITY,
        scale: DEFAULT_SCALE,
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(|s| s.to_string());

        if name == "files" || file_name.is_some() {
            let file_name = file_name.unwrap_or_default();
            let data = read_file(field, &file_name, limits.max_file_bytes).await?;
            // Browsers send an empty, nameless part when no file was picked.
            if file_name.is_empty() && data.is_empty() {
                continue;
            }
            if form.files.len() == limits.max_files {
                UPLOADS_REJECTED_TOTAL
                    .with_label_values(&["too_many_files"])
                    .inc();
                return Err(error(
                    StatusCode::BAD_REQUEST,
                    format!("Too many files: at most {} per batch", limits.max_files),
                ));
            }
            let file_name = if file_name.is_empty() {
                "file".to_string()
            } else {
                file_name
            };
            form.files.push((file_name, data));
            continue;
        }

        match name.as_str() {
            "format" => {
                let text = field.text().await.map_err(multipart_error)?;
                if !text.trim().is_empty() {
                    form.format = text.trim().to_string();
                }
            }
            "quality" => {
                let text = field.text().await.map_err(multipart_error)?;
                if !text.trim().is_empty() {
                    let quality = parse_field("quality", &text)?;
                    form.quality = u8::try_from(quality).unwrap_or(u8::MAX);
                }
            }
            "scale" => {
                let text = field.text().await.map_err(multipart_error)?;
                if !text.trim().is_empty() {
                    form.scale = parse_field("scale", &text)?;
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

// ============================================================================
// Handler
// ============================================================================

/// Converts every uploaded file and reports per-file results.
///
/// A batch where some files fail still answers 200; only problems with the
/// request as a whole (bad parameters, too many or no files, unusable
/// storage) produce an error status.
pub async fn convert_batch(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>, ApiError> {
    let limits = UploadLimits {
        max_files: state.max_files(),
        max_file_bytes: state.max_file_bytes(),
    };
    let form = read_form(&mut multipart, limits).await?;

    let total_bytes: usize = form.files.iter().map(|(_, data)| data.len()).sum();
    info!(
        "Received batch: {} files ({} bytes), format={}, quality={}, scale={}",
        form.files.len(),
        total_bytes,
        form.format,
        form.quality,
        form.scale
    );

    let jobs: Vec<JobDescriptor> = form
        .files
        .into_iter()
        .map(|(name, data)| {
            JobDescriptor::new(name, data, form.format.clone(), form.quality, form.scale)
        })
        .collect();

    let result = match state.orchestrator().run(jobs).await {
        Ok(result) => result,
        Err(e @ BatchError::EmptyBatch) => {
            UPLOADS_REJECTED_TOTAL
                .with_label_values(&["no_files"])
                .inc();
            return Err(error(StatusCode::BAD_REQUEST, e.to_string()));
        }
        Err(e @ BatchError::TooManyJobs { .. }) => {
            UPLOADS_REJECTED_TOTAL
                .with_label_values(&["too_many_files"])
                .inc();
            return Err(error(StatusCode::BAD_REQUEST, e.to_string()));
        }
        Err(e @ BatchError::Storage(_)) => {
            warn!("Batch failed before conversion: {}", e);
            return Err(error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };
    UPLOADED_FILES_TOTAL.inc_by(result.len() as u64);
    UPLOADED_BYTES_TOTAL.inc_by(total_bytes as u64);

    Ok(Json(deliver(&state, result.into_outcomes()).await))
}

/// Turns outcomes into the response, publishing or inlining each output.
async fn deliver(state: &AppState, outcomes: Vec<JobOutcome>) -> BatchResponse {
    let mut results = Vec::new();
    let mut errors = Vec::new();

    for outcome in outcomes {
        match outcome {
            JobOutcome::Success {
                original_name,
                output_name,
                format,
                data,
                size_bytes,
                ..
            } => match state.delivery() {
                DeliveryMode::Inline => results.push(ConvertedFile {
                    name: output_name,
                    size_bytes,
                    download_url: None,
                    data: Some(data_url(format, &data)),
                }),
                DeliveryMode::Link => match state.storage().publish(&output_name, &data).await {
                    Ok(published) => results.push(ConvertedFile {
                        name: output_name,
                        size_bytes,
                        download_url: Some(format!(
                            "/downloads/{}",
                            urlencoding::encode(&published.file_name)
                        )),
                        data: None,
                    }),
                    Err(e) => {
                        warn!("Failed to publish {}: {}", output_name, e);
                        errors.push(FailedFile {
                            name: original_name,
                            error: e.to_string(),
                            kind: e.kind(),
                        });
                    }
                },
            },
            JobOutcome::Failure {
                original_name,
                kind,
                message,
            } => errors.push(FailedFile {
                name: original_name,
                error: message,
                kind,
            }),
        }
    }

    BatchResponse {
        success: errors.is_empty(),
        results,
        errors,
    }
}

fn data_url(format: TargetFormat, data: &[u8]) -> String {
    format!("data:{};base64,{}", format.mime_type(), STANDARD.encode(data))
}
