//! Integration tests for image routes
//!
//! Exercise the HTTP surface end to end against a real router: upload,
//! listing, lookup, deletion and the persisted event trail.

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use sqlx::SqlitePool;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::db::images::ImageStore;
    use crate::features::images::images_routes;
    use crate::features::FeatureState;
    use crate::hub::EventHub;
    use crate::pipeline::PipelineLimiter;
    use crate::storage::{LocalStorage, StorageConfig};

    async fn test_state(pool: SqlitePool) -> (tempfile::TempDir, FeatureState) {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            upload_dir: dir.path().join("uploads"),
            processed_dir: dir.path().join("processed"),
            ..StorageConfig::default()
        };
        let storage = LocalStorage::new(config).await.unwrap();

        let state = FeatureState {
            store: ImageStore::new(pool),
            storage,
            hub: EventHub::new(),
            // jobs queue but nothing processes them here
            limiter: PipelineLimiter::start(1, |_| async {}),
        };
        (dir, state)
    }

    fn test_router(state: FeatureState) -> Router {
        images_routes().with_state(state)
    }

    fn png_bytes() -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]))
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> (String, Vec<u8>) {
        let boundary = "X-DARKROOM-TEST-BOUNDARY";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    fn upload_request(field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
        let (content_type, body) = multipart_body(field, filename, bytes);
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_list_images_empty(pool: SqlitePool) {
        let (_dir, state) = test_state(pool).await;
        let app = test_router(state);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"].as_array().unwrap().len(), 0);
        assert_eq!(json["meta"]["total"], 0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_upload_then_get_roundtrip(pool: SqlitePool) {
        let (_dir, state) = test_state(pool).await;
        let app = test_router(state);

        let response = app
            .clone()
            .oneshot(upload_request("file", "cat.png", &png_bytes()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["status"], "pending");
        assert_eq!(json["data"]["original_filename"], "cat.png");
        assert_eq!(json["data"]["message"], "Image queued for processing");
        let id = json["data"]["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(Request::builder().uri(format!("/{id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["data"]["id"], id);
        assert_eq!(json["data"]["status"], "pending");
        assert!(json["data"]["url"].as_str().unwrap().starts_with("/uploads/"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_upload_rejects_unsupported_extension(pool: SqlitePool) {
        let (_dir, state) = test_state(pool).await;
        let app = test_router(state);

        let response = app
            .oneshot(upload_request("file", "clip.gif", b"gifgifgif"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_upload_without_file_field(pool: SqlitePool) {
        let (_dir, state) = test_state(pool).await;
        let app = test_router(state);

        let response = app
            .oneshot(upload_request("attachment", "cat.png", &png_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_get_missing_image(pool: SqlitePool) {
        let (_dir, state) = test_state(pool).await;
        let app = test_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_get_with_malformed_id(pool: SqlitePool) {
        let (_dir, state) = test_state(pool).await;
        let app = test_router(state);

        let response = app
            .oneshot(Request::builder().uri("/not-a-uuid").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_delete_roundtrip(pool: SqlitePool) {
        let (_dir, state) = test_state(pool).await;
        let app = test_router(state);

        let response = app
            .clone()
            .oneshot(upload_request("file", "cat.png", &png_bytes()))
            .await
            .unwrap();
        let id = json_body(response).await["data"]["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri(format!("/{id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_delete_missing_image(pool: SqlitePool) {
        let (_dir, state) = test_state(pool).await;
        let app = test_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_events_empty_after_upload(pool: SqlitePool) {
        let (_dir, state) = test_state(pool).await;
        let app = test_router(state);

        let response = app
            .clone()
            .oneshot(upload_request("file", "cat.png", &png_bytes()))
            .await
            .unwrap();
        let id = json_body(response).await["data"]["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/{id}/events"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["data"]["image_id"], id);
        assert_eq!(json["data"]["events"].as_array().unwrap().len(), 0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_events_for_missing_image(pool: SqlitePool) {
        let (_dir, state) = test_state(pool).await;
        let app = test_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/{}/events", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_list_reflects_uploads_in_order(pool: SqlitePool) {
        let (_dir, state) = test_state(pool).await;
        let app = test_router(state);

        for name in ["first.png", "second.png"] {
            let response = app
                .clone()
                .oneshot(upload_request("file", name, &png_bytes()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .oneshot(Request::builder().uri("/?limit=10").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        let images = json["data"].as_array().unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0]["original_filename"], "first.png");
        assert_eq!(images[1]["original_filename"], "second.png");
        assert_eq!(json["meta"]["total"], 2);
    }
}
