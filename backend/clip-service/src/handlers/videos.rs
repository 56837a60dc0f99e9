/// Video handlers - upload intake and conversation feed
use actix_multipart::{Field, Multipart};
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::{MembershipDirectory, VideoStore};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{ListVideosQuery, UploadAccepted, VideoListItem};
use crate::services::{validate_conversation_id, validate_extension, IntakeService, TranscodeQueue};
use crate::session::AuthenticatedUser;

/// Longest accepted text form field
const MAX_TEXT_FIELD_BYTES: usize = 1024;

/// Accept a video upload
///
/// `POST /api/upload` (multipart: `conversation_id`, then `file`)
///
/// Responds 202 once the original is on disk and the pending record is
/// committed. Conversion runs in the background.
pub async fn upload_video(
    req: HttpRequest,
    user: Option<AuthenticatedUser>,
    payload: Multipart,
    members: web::Data<Arc<dyn MembershipDirectory>>,
    intake: web::Data<IntakeService>,
    queue: web::Data<TranscodeQueue>,
) -> Result<HttpResponse> {
    let result = accept_upload(&req, user, payload, members.get_ref().as_ref(), &intake, &queue).await;

    let outcome = match &result {
        Ok(_) => "accepted",
        Err(AppError::Unauthorized(_)) => "unauthorized",
        Err(AppError::Forbidden(_)) => "forbidden",
        Err(AppError::NotFound(_)) => "not_found",
        Err(AppError::PayloadTooLarge { .. }) => "too_large",
        Err(AppError::BadRequest(_) | AppError::UnsupportedMediaType(_)) => "rejected",
        Err(_) => "failed",
    };
    metrics::UPLOADS_TOTAL.with_label_values(&[outcome]).inc();

    result
}

async fn accept_upload(
    req: &HttpRequest,
    user: Option<AuthenticatedUser>,
    mut payload: Multipart,
    members: &dyn MembershipDirectory,
    intake: &IntakeService,
    queue: &TranscodeQueue,
) -> Result<HttpResponse> {
    let user = user.ok_or_else(|| AppError::Unauthorized("missing or invalid session".into()))?;

    let limit = intake.max_upload_bytes();
    if declared_length(req).is_some_and(|len| len > limit) {
        return Err(AppError::PayloadTooLarge { limit });
    }

    let mut conversation_id: Option<String> = None;

    while let Some(field) = payload.next().await {
        let mut field = field?;
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "conversation_id" => {
                let value = read_text_field(&mut field).await?;
                validate_conversation_id(&value)?;
                authorize(members, &value, &user.username).await?;
                conversation_id = Some(value);
            }
            "file" => {
                let Some(conversation_id) = conversation_id.as_deref() else {
                    return Err(AppError::BadRequest(
                        "'conversation_id' must be sent before 'file'".into(),
                    ));
                };

                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or_default()
                    .to_string();
                let ext = validate_extension(&filename)?;

                let accepted = intake
                    .accept(&user.username, conversation_id, &ext, field)
                    .await?;

                metrics::UPLOAD_BYTES_TOTAL.inc_by(accepted.bytes);
                info!(
                    video_id = %accepted.record.id,
                    conversation_id = %conversation_id,
                    username = %user.username,
                    "upload accepted"
                );

                let body = UploadAccepted::from(&accepted.record);
                if let Err(e) = queue.submit(accepted.job) {
                    // The record stays pending and is recovered on the next start
                    warn!(video_id = %body.id, error = %e, "could not enqueue transcode");
                }

                return Ok(HttpResponse::Accepted().json(body));
            }
            _ => drain_field(&mut field).await?,
        }
    }

    match conversation_id {
        None => Err(AppError::BadRequest("'conversation_id' is required".into())),
        Some(_) => Err(AppError::BadRequest("'file' is required".into())),
    }
}

/// List a conversation's videos, newest first
///
/// `GET /api/videos?conversation_id=<id>`
pub async fn list_videos(
    user: AuthenticatedUser,
    query: web::Query<ListVideosQuery>,
    members: web::Data<Arc<dyn MembershipDirectory>>,
    store: web::Data<Arc<dyn VideoStore>>,
) -> Result<HttpResponse> {
    let conversation_id = query
        .conversation_id
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    validate_conversation_id(conversation_id)?;
    authorize(members.get_ref().as_ref(), conversation_id, &user.username).await?;

    let videos: Vec<VideoListItem> = store
        .list_by_conversation(conversation_id)
        .await?
        .into_iter()
        .map(VideoListItem::from)
        .collect();

    Ok(HttpResponse::Ok().json(videos))
}

/// 404 for an unknown conversation, 403 for a non-member
async fn authorize(
    members: &dyn MembershipDirectory,
    conversation_id: &str,
    username: &str,
) -> Result<()> {
    if !members.conversation_exists(conversation_id).await? {
        return Err(AppError::NotFound(format!("conversation {conversation_id} not found")));
    }

    if !members.is_member(conversation_id, username).await? {
        warn!(username = %username, conversation_id = %conversation_id, "access by non-member");
        return Err(AppError::Forbidden("not a member of this conversation".into()));
    }

    Ok(())
}

fn declared_length(req: &HttpRequest) -> Option<u64> {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

async fn read_text_field(field: &mut Field) -> Result<String> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::BadRequest("form field too long".into()));
        }
        buf.extend_from_slice(&chunk);
    }

    String::from_utf8(buf)
        .map(|value| value.trim().to_string())
        .map_err(|_| AppError::BadRequest("form field is not valid UTF-8".into()))
}

/// Skip a field the upload does not use, bounded like text fields
async fn drain_field(field: &mut Field) -> Result<()> {
    let mut seen = 0;
    while let Some(chunk) = field.next().await {
        seen += chunk?.len();
        if seen > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::BadRequest("form field too long".into()));
        }
    }
    Ok(())
}
