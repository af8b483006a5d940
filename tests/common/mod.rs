#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse},
    http::StatusCode,
    middleware::Logger,
    test, web, App, Error,
};
use async_trait::async_trait;
use serde_json::{json, Value};

use taskpad::auth::TokenKeys;
use taskpad::cache::MemoryVerificationCache;
use taskpad::mailer::{EmailData, Mailer};
use taskpad::repository::MemoryStore;
use taskpad::routes::{self, health};
use taskpad::services::{IdentityService, IdentitySettings, TaskService};
use taskpad::AppError;

pub const TEST_SECRET: &str = "integration_test_secret";

/// Captures outgoing verification emails instead of sending them.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, EmailData)>>,
}

impl RecordingMailer {
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, data)| data.code.clone())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, email: &EmailData) -> Result<(), AppError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), email.clone()));
        Ok(())
    }
}

/// Services wired to in-memory backends, shared by every app built from it.
pub struct TestState {
    pub identity: web::Data<IdentityService>,
    pub tasks: web::Data<TaskService>,
    pub tokens: web::Data<TokenKeys>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestState {
    pub fn new() -> Self {
        Self::with_otp_ttl(Duration::from_secs(60 * 60))
    }

    pub fn with_otp_ttl(otp_ttl: Duration) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let tokens = TokenKeys::new(TEST_SECRET, 2);

        let identity = IdentityService::new(
            store.clone(),
            Arc::new(MemoryVerificationCache::new()),
            mailer.clone(),
            tokens.clone(),
            IdentitySettings {
                otp_ttl,
                otp_digits: 6,
                bcrypt_cost: 4,
            },
        );

        Self {
            identity: web::Data::new(identity),
            tasks: web::Data::new(TaskService::new(store)),
            tokens: web::Data::new(tokens),
            mailer,
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(self.identity.clone())
            .app_data(self.tasks.clone())
            .app_data(self.tokens.clone())
            .wrap(Logger::default())
            .service(health::health)
            .service(web::scope("/api").configure(routes::config))
    }
}

/// Sends `req` and returns the status with the body parsed as JSON (`Null` if empty).
pub async fn send<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            panic!("non-JSON body: {}", String::from_utf8_lossy(&body))
        })
    };
    (status, json)
}

pub async fn post_json<S, B>(app: &S, uri: &str, payload: Value) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri(uri)
        .set_json(&payload)
        .to_request();
    send(app, req).await
}

/// Registers a user and logs in, returning `(user_id, token)`.
pub async fn register_and_login<S, B>(app: &S, email: &str, username: &str) -> (i64, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let (status, body) = post_json(
        app,
        "/api/auth/register",
        json!({ "username": username, "email": email, "password": "Password123!" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

    let (status, body) = post_json(
        app,
        "/api/auth/login",
        json!({ "email": email, "password": "Password123!" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    let user_id = body["user"]["id"].as_i64().expect("user id in login response");
    let token = body["token"].as_str().expect("token in login response").to_string();
    (user_id, token)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
