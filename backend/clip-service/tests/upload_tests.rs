//! Upload endpoint: acceptance, rejections and their side effects

mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use clip_service::db::VideoStore;
use clip_service::error::ErrorResponse;
use clip_service::models::UploadAccepted;
use common::{multipart, Behavior, Part, TestEnv};
use std::time::Duration;
use video_core::VideoStatus;

fn upload_request(
    cookie: Option<actix_web::cookie::Cookie<'static>>,
    parts: &[Part<'_>],
) -> test::TestRequest {
    let (content_type, body) = multipart(parts);
    let req = test::TestRequest::post()
        .uri("/api/upload")
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body);
    match cookie {
        Some(cookie) => req.cookie(cookie),
        None => req,
    }
}

#[actix_web::test]
async fn test_accepted_upload_is_pending_with_original_on_disk() {
    let env = TestEnv::new(Behavior::Stall).await;
    let app = test::init_service(env.app()).await;

    let req = upload_request(
        Some(env.login("alice")),
        &[
            Part::Text("conversation_id", "conv-1"),
            Part::File("file", "clip.mp4", b"fake video bytes"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let body: UploadAccepted = test::read_body_json(resp).await;
    assert_eq!(body.status, VideoStatus::Pending);
    assert_eq!(body.id.len(), 32);

    let record = env.record(&body.id).await;
    assert_eq!(record.uploader, "alice");
    assert_eq!(record.conversation_id, "conv-1");
    assert_eq!(record.status, VideoStatus::Pending);

    let original = env
        .videos_dir()
        .join("conv-1")
        .join(format!("original_{}.mp4", body.id));
    assert_eq!(std::fs::read(&original).unwrap(), b"fake video bytes");
    assert_eq!(env.stored_files(), vec![original]);

    env.shutdown().await;
}

#[actix_web::test]
async fn test_alice_uploads_clip_to_conv_1_and_it_becomes_ready() {
    let env = TestEnv::new(Behavior::Succeed).await;
    let app = test::init_service(env.app()).await;

    let req = upload_request(
        Some(env.login("alice")),
        &[
            Part::Text("conversation_id", "conv-1"),
            Part::File("file", "clip.mp4", b"fake video bytes"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: UploadAccepted = test::read_body_json(resp).await;

    let record = env.wait_for_terminal(&body.id).await;
    assert_eq!(record.status, VideoStatus::Ready);

    let canonical = env.videos_dir().join("conv-1").join(format!("{}.mp4", body.id));
    assert_eq!(record.canonical_path, canonical.to_string_lossy());
    assert_eq!(env.stored_files(), vec![canonical]);
    assert_eq!(env.transcoder.attempts(), 1);

    env.shutdown().await;
}

#[actix_web::test]
async fn test_disallowed_extension_writes_nothing() {
    let env = TestEnv::new(Behavior::Succeed).await;
    let app = test::init_service(env.app()).await;

    let req = upload_request(
        Some(env.login("alice")),
        &[
            Part::Text("conversation_id", "conv-1"),
            Part::File("file", "clip.exe", b"MZ"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.code, "UNSUPPORTED_FILE_TYPE");
    assert!(env.stored_files().is_empty());
    assert!(env.store.list_by_conversation("conv-1").await.unwrap().is_empty());
    assert_eq!(env.transcoder.attempts(), 0);

    env.shutdown().await;
}

#[actix_web::test]
async fn test_non_member_is_forbidden_and_nothing_is_written() {
    let env = TestEnv::new(Behavior::Succeed).await;
    let app = test::init_service(env.app()).await;

    // bob only belongs to conv-2
    let req = upload_request(
        Some(env.login("bob")),
        &[
            Part::Text("conversation_id", "conv-1"),
            Part::File("file", "clip.mp4", b"fake video bytes"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    assert!(env.stored_files().is_empty());
    assert!(env.store.list_by_conversation("conv-1").await.unwrap().is_empty());

    env.shutdown().await;
}

#[actix_web::test]
async fn test_missing_session_is_unauthorized() {
    let env = TestEnv::new(Behavior::Succeed).await;
    let app = test::init_service(env.app()).await;

    let req = upload_request(
        None,
        &[
            Part::Text("conversation_id", "conv-1"),
            Part::File("file", "clip.mp4", b"fake video bytes"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let forged = actix_web::cookie::Cookie::new(clip_service::session::SESSION_COOKIE_NAME, "nope");
    let req = upload_request(
        Some(forged),
        &[
            Part::Text("conversation_id", "conv-1"),
            Part::File("file", "clip.mp4", b"fake video bytes"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(env.stored_files().is_empty());

    env.shutdown().await;
}

#[actix_web::test]
async fn test_missing_or_late_conversation_id_is_bad_request() {
    let env = TestEnv::new(Behavior::Succeed).await;
    let app = test::init_service(env.app()).await;
    let cookie = env.login("alice");

    let req = upload_request(
        Some(cookie.clone()),
        &[Part::File("file", "clip.mp4", b"fake video bytes")],
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = upload_request(
        Some(cookie.clone()),
        &[
            Part::File("file", "clip.mp4", b"fake video bytes"),
            Part::Text("conversation_id", "conv-1"),
        ],
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = upload_request(
        Some(cookie),
        &[
            Part::Text("conversation_id", "../conv-1"),
            Part::File("file", "clip.mp4", b"fake video bytes"),
        ],
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    assert!(env.stored_files().is_empty());
    env.shutdown().await;
}

#[actix_web::test]
async fn test_missing_file_is_bad_request() {
    let env = TestEnv::new(Behavior::Succeed).await;
    let app = test::init_service(env.app()).await;

    let req = upload_request(
        Some(env.login("alice")),
        &[Part::Text("conversation_id", "conv-1")],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert!(body.message.contains("'file'"));
    env.shutdown().await;
}

#[actix_web::test]
async fn test_oversized_upload_is_rejected_without_leftovers() {
    let env = TestEnv::with_limit(Behavior::Succeed, 64).await;
    let app = test::init_service(env.app()).await;

    let big = vec![0u8; 4096];
    let req = upload_request(
        Some(env.login("alice")),
        &[
            Part::Text("conversation_id", "conv-1"),
            Part::File("file", "clip.mp4", &big),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    assert!(env.stored_files().is_empty());
    assert!(env.store.list_by_conversation("conv-1").await.unwrap().is_empty());
    env.shutdown().await;
}

#[actix_web::test]
async fn test_unknown_conversation_is_not_found_and_nothing_is_written() {
    let env = TestEnv::new(Behavior::Succeed).await;
    let app = test::init_service(env.app()).await;

    let req = upload_request(
        Some(env.login("alice")),
        &[
            Part::Text("conversation_id", "conv-nope"),
            Part::File("file", "clip.mp4", b"fake video bytes"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.code, "NOT_FOUND");
    assert!(env.stored_files().is_empty());
    assert!(env.store.list_pending().await.unwrap().is_empty());

    env.shutdown().await;
}

#[actix_web::test]
async fn test_full_transcode_queue_does_not_delay_acceptance() {
    // One worker stuck forever, one queue slot
    let env = TestEnv::with_queue(Behavior::Stall, 1, 1).await;
    let app = test::init_service(env.app()).await;

    for n in 0..5 {
        let req = upload_request(
            Some(env.login("alice")),
            &[
                Part::Text("conversation_id", "conv-1"),
                Part::File("file", "clip.mp4", b"fake video bytes"),
            ],
        )
        .to_request();
        let resp = tokio::time::timeout(Duration::from_secs(2), test::call_service(&app, req))
            .await
            .unwrap_or_else(|_| panic!("upload #{n} was not answered"));
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(env.store.list_pending().await.unwrap().len(), 5);
    assert_eq!(env.state.queue.in_flight(), 1);

    env.shutdown().await;
}

#[actix_web::test]
async fn test_oversized_unknown_field_is_bad_request() {
    let env = TestEnv::new(Behavior::Succeed).await;
    let app = test::init_service(env.app()).await;

    let filler = "x".repeat(4096);
    let req = upload_request(
        Some(env.login("alice")),
        &[
            Part::Text("conversation_id", "conv-1"),
            Part::Text("comment", &filler),
            Part::File("file", "clip.mp4", b"fake video bytes"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(env.stored_files().is_empty());

    env.shutdown().await;
}
