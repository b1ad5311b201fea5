// src/server/mod.rs
//! HTTP surface: `POST /api/csv/column/{n}` plus a health check.

use bytes::BufMut;
use futures_util::TryStreamExt;
use serde::Serialize;
use std::{
    convert::Infallible,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, error, info, warn};
use warp::{
    http::{header, StatusCode},
    hyper::Body,
    multipart::{FormData, Part},
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::{
    aggregate::ColumnNumber, archive::stage_upload, config::Config, error::ServiceError,
    output::to_csv_bytes,
};

/// JSON body sent with every failure.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    status_code: u16,
    message: String,
}

/// An upload pulled out of the multipart form.
#[derive(Debug)]
struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// All routes, with rejections turned into the JSON error envelope.
pub fn routes(
    config: Arc<Config>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(health_check);

    let column = warp::path!("api" / "csv" / "column" / String)
        .and(warp::post())
        .and(warp::multipart::form().max_length(config.max_upload_bytes))
        .and(warp::any().map(move || Arc::clone(&config)))
        .and_then(extract_columns);

    health.or(column).recover(handle_rejection)
}

async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "csvcolumns"
    })))
}

async fn extract_columns(
    column: String,
    form: FormData,
    config: Arc<Config>,
) -> Result<Response, Rejection> {
    let start = Instant::now();
    let outcome = with_deadline(config.request_timeout, process_request(column, form, &config))
        .await
        .and_then(|r| r);

    match outcome {
        Ok((filename, csv)) => {
            info!(
                upload = %filename,
                bytes = csv.len(),
                elapsed = ?start.elapsed(),
                "served aggregated csv"
            );
            Ok(csv_reply(&filename, csv))
        }
        Err(e) => {
            if e.status_code().is_server_error() {
                error!(elapsed = ?start.elapsed(), "request failed: {}", e);
            } else {
                warn!(elapsed = ?start.elapsed(), "rejected request: {}", e);
            }
            Ok(error_reply(e.status_code(), e.to_string()))
        }
    }
}

/// Run `fut`, giving up with [`ServiceError::Timeout`] once `limit` passes.
pub async fn with_deadline<F, T>(limit: Duration, fut: F) -> Result<T, ServiceError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ServiceError::Timeout(limit.as_secs()))
}

async fn process_request(
    column: String,
    form: FormData,
    config: &Config,
) -> Result<(String, Vec<u8>), ServiceError> {
    let upload = read_upload(form, &config.upload_field)
        .await?
        .ok_or_else(|| ServiceError::MissingUpload(config.upload_field.clone()))?;
    if !upload.filename.ends_with(".zip") {
        return Err(ServiceError::NotZip);
    }
    let column: ColumnNumber = column
        .parse()
        .map_err(|_| ServiceError::InvalidColumn(column.clone()))?;
    info!(column = %column, upload = %upload.filename, bytes = upload.bytes.len(), "processing upload");

    let staging_dir = config.staging_dir.clone();
    let Upload { filename, bytes } = upload;
    let name = filename.clone();
    // The staged file is dropped inside the blocking task, so it goes away
    // even if the deadline fires first.
    let csv = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ServiceError> {
        let staged = stage_upload(&staging_dir, &name, &bytes)?;
        let result = staged.aggregate(column)?;
        to_csv_bytes(&result.into_rows())
    })
    .await
    .map_err(|e| ServiceError::Internal(format!("aggregation task failed: {}", e)))??;

    Ok((filename, csv))
}

/// Find the part named `field` and buffer its contents.
async fn read_upload(mut form: FormData, field: &str) -> Result<Option<Upload>, ServiceError> {
    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| ServiceError::Upload(e.to_string()))?
    {
        if part.name() != field {
            continue;
        }
        let filename = base_name(part.filename().unwrap_or_default()).to_string();
        let bytes = read_part(part).await?;
        return Ok(Some(Upload { filename, bytes }));
    }
    Ok(None)
}

/// Last path component of a client-supplied filename.
fn base_name(raw: &str) -> &str {
    let trimmed = raw.trim_end_matches(['/', '\\']);
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

async fn read_part(part: Part) -> Result<Vec<u8>, ServiceError> {
    part.stream()
        .try_fold(Vec::new(), |mut acc, buf| async move {
            acc.put(buf);
            Ok(acc)
        })
        .await
        .map_err(|e| ServiceError::Upload(e.to_string()))
}

fn csv_reply(filename: &str, csv: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename={}.csv", filename);
    warp::http::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv")
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(csv))
        .unwrap_or_else(|e| {
            error!("building csv response: {}", e);
            error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to build response: {}", e),
            )
        })
}

fn error_reply(status: StatusCode, message: String) -> Response {
    let body = ErrorResponse {
        status_code: status.as_u16(),
        message,
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(e) = err.find::<warp::reject::MethodNotAllowed>() {
        (StatusCode::METHOD_NOT_ALLOWED, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::PayloadTooLarge>() {
        (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::MissingHeader>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::UnsupportedMediaType>() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string())
    } else {
        debug!("unhandled rejection: {:?}", err);
        (StatusCode::BAD_REQUEST, "bad request".to_string())
    };
    warn!(status = status.as_u16(), "rejected: {}", message);
    Ok(error_reply(status, message))
}
