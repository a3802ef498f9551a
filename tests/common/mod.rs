#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use showcase::{
    auth::{AdminAllowlist, OAuthProfile, OAuthProvider},
    build_router,
    config::{AuthConfig, Config, DatabaseConfig, ServerConfig},
    db,
    media::{ClientConfig, ImageStore, ImageUpload, StoredImage},
    AppState,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "owner@example.com";

/// Image store that remembers every call and can be told to fail
#[derive(Default)]
pub struct RecordingImageStore {
    pub uploads: Mutex<Vec<(String, String)>>,
    pub deleted: Mutex<Vec<String>>,
    pub deleted_folders: Mutex<Vec<String>>,
    /// Fail the upload with this 1-based index
    pub fail_upload_at: Mutex<Option<usize>>,
    counter: AtomicUsize,
}

impl RecordingImageStore {
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn deleted(&self) -> Vec<String> {
        let mut deleted = self.deleted.lock().unwrap().clone();
        deleted.sort();
        deleted
    }
}

#[async_trait]
impl ImageStore for RecordingImageStore {
    async fn upload(&self, folder: &str, image: &ImageUpload) -> Result<StoredImage> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.fail_upload_at.lock().unwrap() == Some(n) {
            return Err(anyhow::anyhow!("simulated upload failure"));
        }

        let public_id = format!("{}/img-{}", folder, n);
        self.uploads.lock().unwrap().push((public_id.clone(), image.filename.clone()));
        Ok(StoredImage {
            url: format!("https://cdn.example/{}.jpg", public_id),
            public_id,
        })
    }

    async fn delete(&self, public_ids: &[String]) -> Result<usize> {
        self.deleted.lock().unwrap().extend(public_ids.iter().cloned());
        Ok(public_ids.len())
    }

    async fn delete_folder(&self, folder: &str) -> Result<usize> {
        self.deleted_folders.lock().unwrap().push(folder.to_string());
        Ok(0)
    }

    fn client_config(&self) -> Option<ClientConfig> {
        Some(ClientConfig {
            cloud_name: "test-cloud".to_string(),
            api_key: "test-key".to_string(),
            upload_preset: None,
            folder: "site".to_string(),
        })
    }

    fn root_folder(&self) -> &str {
        "site"
    }
}

/// OAuth provider that accepts codes of the form `code-for:{email}`
pub struct FakeOAuth;

#[async_trait]
impl OAuthProvider for FakeOAuth {
    fn id(&self) -> &'static str {
        "google"
    }

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String> {
        Ok(format!("https://accounts.test/auth?state={}&redirect_uri={}", state, redirect_uri))
    }

    async fn exchange(&self, code: &str, _redirect_uri: &str) -> Result<OAuthProfile> {
        let email = code
            .strip_prefix("code-for:")
            .ok_or_else(|| anyhow::anyhow!("bad code"))?;
        Ok(OAuthProfile {
            provider: "google".to_string(),
            provider_account_id: format!("sub-{}", email),
            email: email.to_string(),
            name: Some("Test".to_string()),
            ..Default::default()
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub images: Arc<RecordingImageStore>,
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            public_url: "http://localhost:3000".to_string(),
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        },
        auth: AuthConfig {
            admin_emails: ADMIN_EMAIL.to_string(),
            session_secret: "test-secret".to_string(),
            session_max_age_days: 30,
            google_client_id: "client".to_string(),
            google_client_secret: "secret".to_string(),
        },
        cloudinary: None,
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = db::connect_in_memory().await.unwrap();
        let images = Arc::new(RecordingImageStore::default());
        let state = AppState::new(pool, test_config(), images.clone(), Arc::new(FakeOAuth));

        Self {
            router: build_router(state.clone()),
            state,
            images,
        }
    }

    /// Sign someone in directly through storage; returns (cookie header, user id)
    pub async fn sign_in(&self, email: &str) -> (String, String) {
        let allowlist = AdminAllowlist::from_csv(ADMIN_EMAIL);
        let profile = OAuthProfile {
            provider: "google".to_string(),
            provider_account_id: format!("sub-{}", email),
            email: email.to_string(),
            ..Default::default()
        };
        let (token, session) = self
            .state
            .auth
            .sign_in(&profile, &allowlist, Duration::days(30), Utc::now())
            .await
            .unwrap();
        (format!("showcase.session-token={}", token), session.user_id)
    }

    pub async fn admin_cookie(&self) -> String {
        self.sign_in(ADMIN_EMAIL).await.0
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (u16, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status().as_u16();
        (status, body_json(response).await)
    }

    pub async fn multipart(&self, method: Method, uri: &str, cookie: Option<&str>, parts: &[Part]) -> (u16, Value) {
        let (content_type, body) = multipart_body(parts);
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let response = self.send(builder.body(Body::from(body)).unwrap()).await;
        let status = response.status().as_u16();
        (status, body_json(response).await)
    }

    pub async fn project_count(&self) -> i64 {
        let projects = self.state.projects.list(false).await.unwrap();
        projects.len() as i64
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
}

/// One multipart form part
pub enum Part {
    Text(&'static str, String),
    File {
        name: String,
        filename: &'static str,
        content_type: &'static str,
        bytes: Vec<u8>,
    },
}

impl Part {
    pub fn text(name: &'static str, value: impl Into<String>) -> Self {
        Part::Text(name, value.into())
    }

    pub fn image(name: impl Into<String>, filename: &'static str, content_type: &'static str, size: usize) -> Self {
        Part::File {
            name: name.into(),
            filename,
            content_type,
            bytes: vec![0xAB; size],
        }
    }
}

const BOUNDARY: &str = "showcase-test-boundary";

fn multipart_body(parts: &[Part]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes());
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}
