#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use cropdoc::api::AppState;
use cropdoc::config::Config;
use cropdoc::predictor::{PlaceholderPredictor, Predictor};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "harvest-moon-42";
const BOUNDARY: &str = "cropdoc-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    _dir: TempDir,
}

pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", dir.path().join("test.db").display());
    config.storage.media_root = dir.path().join("media").to_string_lossy().to_string();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.observability.metrics_enabled = false;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(PlaceholderPredictor::new(224)), |_| {}).await
}

pub async fn spawn_app_with(
    predictor: Arc<dyn Predictor>,
    customize: impl FnOnce(&mut Config),
) -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = test_config(&dir);
    customize(&mut config);

    let state = cropdoc::api::create_app_state_with_predictor(config, predictor, None)
        .await
        .expect("Failed to create app state");

    TestApp {
        router: cropdoc::api::router(state.clone()),
        state,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).to_string())
            })
        };
        (status, body)
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn register(&self, username: &str) -> (StatusCode, Value) {
        self.post_json(
            "/api/users/register/",
            json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": PASSWORD,
                "password2": PASSWORD,
                "first_name": "Test",
            }),
        )
        .await
    }

    /// Registers `username` and returns `(user_id, access_token, refresh_token)`.
    pub async fn signup(&self, username: &str) -> (i32, String, String) {
        let (status, body) = self.register(username).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let user_id = body["user"]["id"].as_i64().unwrap() as i32;

        let (status, body) = self
            .post_json(
                "/api/users/token/",
                json!({ "username": username, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "token failed: {body}");

        (
            user_id,
            body["access"].as_str().unwrap().to_string(),
            body["refresh"].as_str().unwrap().to_string(),
        )
    }

    pub async fn upload(
        &self,
        token: &str,
        field: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> (StatusCode, Value) {
        self.send(upload_request(token, field, file_name, bytes)).await
    }

    pub async fn record_count(&self, user_id: i32) -> u64 {
        self.state
            .store
            .analysis_count_for_user(user_id)
            .await
            .unwrap()
    }

    pub fn stored_upload_count(&self) -> usize {
        std::fs::read_dir(self.state.storage.media_root().join("uploads"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn upload_request(token: &str, field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analysis/upload/")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, file_name, bytes)))
        .unwrap()
}

pub fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7 % 256) as u8, 140, (y * 11 % 256) as u8])
    });
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}
