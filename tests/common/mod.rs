// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use elearning::cache::MemoryKv;
use elearning::config::Config;
use elearning::db::{Database, FirestoreDb, MemoryDb};
use elearning::error::AppError;
use elearning::models::{ContentSection, Course, Link, Notification, Role, User};
use elearning::routes::create_router;
use elearning::services::password::hash_password;
use elearning::services::{IdentityVerifier, Mail, Mailer};
use elearning::AppState;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse-battery";

pub const GOOGLE_CLIENT_ID: &str = "test-client.apps.googleusercontent.com";
const ID_TOKEN_KID: &str = "test-key";
const ID_TOKEN_SIGNING_KEY: &[u8] = include_bytes!("../fixtures/id_token_signing_key.pem");
const ID_TOKEN_PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/id_token_public_key.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Connect to the Firestore emulator.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Router whose primary store is unreachable; every database call fails.
#[allow(dead_code)]
pub fn create_offline_app() -> Router {
    let config = Config::test_default();
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(FirestoreDb::new_offline()),
        Arc::new(MemoryKv::new()),
        Arc::new(RecordingMailer::default()),
        test_identity_verifier(&config),
    ));
    create_router(state)
}

/// Verifier that trusts only the fixture signing key.
pub fn test_identity_verifier(config: &Config) -> IdentityVerifier {
    let config = Config {
        google_client_id: Some(GOOGLE_CLIENT_ID.to_string()),
        ..config.clone()
    };
    let key = DecodingKey::from_rsa_pem(ID_TOKEN_PUBLIC_KEY).unwrap();
    IdentityVerifier::new_with_static_key(&config, ID_TOKEN_KID, key).unwrap()
}

/// Sign arbitrary ID token claims with the fixture key.
#[allow(dead_code)]
pub fn sign_id_token(claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(ID_TOKEN_KID.to_string());
    let key = EncodingKey::from_rsa_pem(ID_TOKEN_SIGNING_KEY).unwrap();
    jsonwebtoken::encode(&header, claims, &key).unwrap()
}

/// Claims of a valid Google ID token for `email`.
#[allow(dead_code)]
pub fn id_token_claims(email: &str, name: &str) -> Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "iss": "https://accounts.google.com",
        "aud": GOOGLE_CLIENT_ID,
        "sub": format!("google-{email}"),
        "iat": now,
        "exp": now + 3600,
        "email": email,
        "email_verified": true,
        "name": name,
        "picture": "https://img.example.com/avatar.png"
    })
}

#[allow(dead_code)]
pub fn google_id_token(email: &str, name: &str) -> String {
    sign_id_token(&id_token_claims(email, name))
}

/// Mailer that keeps everything it was asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Mail>>,
}

#[allow(dead_code)]
impl RecordingMailer {
    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_to(&self, to: &str) -> Option<Mail> {
        self.sent().into_iter().rev().find(|m| m.to == to)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: Mail) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub db: Arc<MemoryDb>,
    pub kv: Arc<MemoryKv>,
    pub mailer: Arc<RecordingMailer>,
}

/// Create a test app on in-memory stores.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let db = Arc::new(MemoryDb::new());
    build_test_app(config, db.clone(), db)
}

/// Test app whose store yields on every call, so concurrent requests
/// interleave between their reads and their conditional writes.
#[allow(dead_code)]
pub fn create_contended_test_app() -> (TestApp, Arc<ContendedDb>) {
    let db = Arc::new(MemoryDb::new());
    let contended = Arc::new(ContendedDb::new(db.clone()));
    (
        build_test_app(Config::test_default(), db, contended.clone()),
        contended,
    )
}

fn build_test_app(config: Config, db: Arc<MemoryDb>, primary: Arc<dyn Database>) -> TestApp {
    let kv = Arc::new(MemoryKv::new());
    let mailer = Arc::new(RecordingMailer::default());

    let identity = test_identity_verifier(&config);
    let state = Arc::new(AppState::new(
        config,
        primary,
        kv.clone(),
        mailer.clone(),
        identity,
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        kv,
        mailer,
    }
}

/// [`MemoryDb`] wrapper that yields before every operation and records
/// version conflicts. It can also be told to lose every course write, as
/// if another writer always committed first.
#[allow(dead_code)]
pub struct ContendedDb {
    inner: Arc<MemoryDb>,
    pub conflicts: AtomicUsize,
    pub course_replace_attempts: AtomicUsize,
    lose_course_writes: AtomicBool,
}

#[allow(dead_code)]
impl ContendedDb {
    pub fn new(inner: Arc<MemoryDb>) -> Self {
        Self {
            inner,
            conflicts: AtomicUsize::new(0),
            course_replace_attempts: AtomicUsize::new(0),
            lose_course_writes: AtomicBool::new(false),
        }
    }

    pub fn lose_course_writes(&self) {
        self.lose_course_writes.store(true, Ordering::SeqCst);
    }

    pub fn conflicts(&self) -> usize {
        self.conflicts.load(Ordering::SeqCst)
    }

    fn record<T>(&self, result: Result<T, AppError>) -> Result<T, AppError> {
        if matches!(result, Err(AppError::Conflict(_))) {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
        }
        result
    }
}

#[async_trait]
impl Database for ContendedDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        tokio::task::yield_now().await;
        self.inner.get_user(user_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        tokio::task::yield_now().await;
        self.inner.find_user_by_email(email).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        tokio::task::yield_now().await;
        self.inner.insert_user(user).await
    }

    async fn replace_user(&self, user: &User, expected_version: u64) -> Result<(), AppError> {
        tokio::task::yield_now().await;
        self.record(self.inner.replace_user(user, expected_version).await)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        tokio::task::yield_now().await;
        self.inner.list_users().await
    }

    async fn delete_user(&self, user_id: &str) -> Result<bool, AppError> {
        tokio::task::yield_now().await;
        self.inner.delete_user(user_id).await
    }

    async fn get_course(&self, course_id: &str) -> Result<Option<Course>, AppError> {
        tokio::task::yield_now().await;
        self.inner.get_course(course_id).await
    }

    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        tokio::task::yield_now().await;
        self.inner.list_courses().await
    }

    async fn insert_course(&self, course: &Course) -> Result<(), AppError> {
        tokio::task::yield_now().await;
        self.inner.insert_course(course).await
    }

    async fn replace_course(&self, course: &Course, expected_version: u64) -> Result<(), AppError> {
        tokio::task::yield_now().await;
        self.course_replace_attempts.fetch_add(1, Ordering::SeqCst);
        if self.lose_course_writes.load(Ordering::SeqCst) {
            return self.record(Err(AppError::Conflict(format!(
                "Course {} was modified concurrently",
                course.id
            ))));
        }
        self.record(self.inner.replace_course(course, expected_version).await)
    }

    async fn delete_course(&self, course_id: &str) -> Result<bool, AppError> {
        tokio::task::yield_now().await;
        self.inner.delete_course(course_id).await
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.inner.insert_notification(notification).await
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>, AppError> {
        self.inner.list_notifications().await
    }

    async fn upsert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.inner.upsert_notification(notification).await
    }

    async fn get_notification(
        &self,
        notification_id: &str,
    ) -> Result<Option<Notification>, AppError> {
        self.inner.get_notification(notification_id).await
    }

    async fn delete_notification(&self, notification_id: &str) -> Result<bool, AppError> {
        self.inner.delete_notification(notification_id).await
    }
}

/// Decoded response.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub cookies: Vec<String>,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies
            .iter()
            .find(|c| c.starts_with(&format!("{name}=")))
            .cloned()
    }

    /// Value of a `Set-Cookie` header, without attributes.
    pub fn cookie_value(&self, name: &str) -> Option<String> {
        let cookie = self.cookie(name)?;
        let pair = cookie.split(';').next()?;
        Some(pair[name.len() + 1..].to_string())
    }

    pub fn code(&self) -> Option<&str> {
        self.body.get("code").and_then(Value::as_str)
    }
}

/// Builder for requests against the test router.
pub struct Call {
    method: Method,
    uri: String,
    body: Option<Value>,
    bearer: Option<String>,
    cookies: Vec<String>,
}

#[allow(dead_code)]
impl Call {
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            body: None,
            bearer: None,
            cookies: Vec::new(),
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn put(uri: &str) -> Self {
        Self::new(Method::PUT, uri)
    }

    pub fn delete(uri: &str) -> Self {
        Self::new(Method::DELETE, uri)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push(format!("{name}={value}"));
        self
    }

    pub async fn send(self, router: &Router) -> TestResponse {
        let mut builder = Request::builder().method(self.method).uri(&self.uri);
        if let Some(token) = &self.bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if !self.cookies.is_empty() {
            builder = builder.header(header::COOKIE, self.cookies.join("; "));
        }
        let request = match self.body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            cookies,
        }
    }
}

/// Insert a verified user with [`PASSWORD`].
#[allow(dead_code)]
pub async fn seed_user(app: &TestApp, name: &str, email: &str, role: Role) -> User {
    let mut user = User::new(
        name.to_string(),
        email.to_string(),
        Some(hash_password(PASSWORD).unwrap()),
        "2026-01-01T00:00:00.000Z",
    );
    user.role = role;
    user.is_verified = true;
    app.db.insert_user(&user).await.unwrap();
    user
}

/// Credentials from a successful login.
#[allow(dead_code)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub body: Value,
}

#[allow(dead_code)]
pub async fn login(app: &TestApp, email: &str) -> Session {
    let response = Call::post("/api/v1/login")
        .json(json!({"email": email, "password": PASSWORD}))
        .send(&app.router)
        .await;
    assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);

    Session {
        access_token: response.cookie_value("access_token").unwrap(),
        refresh_token: response.cookie_value("refresh_token").unwrap(),
        body: response.body,
    }
}

/// Course with one section that carries a video, a link and no questions.
#[allow(dead_code)]
pub async fn seed_course(app: &TestApp, id: &str) -> Course {
    let course = Course {
        id: id.to_string(),
        name: format!("Course {id}"),
        description: "Learn things".to_string(),
        price: 49.0,
        thumbnail: Some("https://img.example.com/original.png".to_string()),
        sections: vec![ContentSection {
            id: "s1".to_string(),
            title: "Getting started".to_string(),
            video_section: "Intro".to_string(),
            description: "First steps".to_string(),
            video_url: "https://videos.example.com/secret-intro".to_string(),
            video_length: 10,
            links: vec![Link {
                title: "Notes".to_string(),
                url: "https://notes.example.com/intro".to_string(),
            }],
            questions: vec![],
        }],
        created_at: "2026-01-01T00:00:00.000Z".to_string(),
        updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        ..Default::default()
    };
    app.db.insert_course(&course).await.unwrap();
    course
}

/// Give a seeded user a purchased course directly in the store.
#[allow(dead_code)]
pub async fn grant_course(app: &TestApp, user: &User, course_id: &str) {
    app.state
        .users
        .update(&user.id, |u| {
            u.courses.push(course_id.to_string());
            Ok(())
        })
        .await
        .unwrap();
}

/// Poll until `check` holds; side effects run on spawned tasks.
#[allow(dead_code)]
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
