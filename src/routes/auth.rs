use crate::{
    auth::{AuthResponse, LoginRequest, RegisterRequest, StartVerificationRequest, VerifyRequest},
    error::AppError,
    services::IdentityService,
};
use actix_web::{post, web, HttpResponse, Responder};
use serde_json::json;

/// Register a new user
///
/// Creates an unverified account and returns it.
#[post("/register")]
pub async fn register(
    identity: web::Data<IdentityService>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let user = identity
        .register(
            &register_data.username,
            &register_data.email,
            &register_data.password,
        )
        .await?;

    Ok(HttpResponse::Created().json(json!({ "user": user })))
}

/// Start email verification
///
/// Emails a one-time code to the given address.
#[post("/verification")]
pub async fn start_verification(
    identity: web::Data<IdentityService>,
    request: web::Json<StartVerificationRequest>,
) -> Result<impl Responder, AppError> {
    let expires_at = identity.start_verification(&request.email).await?;

    Ok(HttpResponse::Accepted().json(json!({
        "detail": "verification code sent",
        "expires_at": expires_at
    })))
}

/// Verify user
///
/// Consumes a one-time code and marks the matching account as verified.
#[post("/verify")]
pub async fn verify(
    identity: web::Data<IdentityService>,
    request: web::Json<VerifyRequest>,
) -> Result<impl Responder, AppError> {
    let user = identity.verify_user(&request.code).await?;

    Ok(HttpResponse::Ok().json(json!({ "user": user })))
}

/// Login user
///
/// Authenticates a user and returns an authentication token.
#[post("/login")]
pub async fn login(
    identity: web::Data<IdentityService>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let (user, token) = identity
        .login(&login_data.email, &login_data.password)
        .await?;

    Ok(HttpResponse::Ok().json(AuthResponse { token, user }))
}
