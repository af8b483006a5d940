use crate::{auth::AuthenticatedUserId, error::AppError, services::IdentityService};
use actix_web::{delete, get, web, HttpResponse, Responder};

/// Returns the authenticated user's account.
#[get("/me")]
pub async fn current_user(
    identity: web::Data<IdentityService>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let user = identity.get_user(user_id.0).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Deletes the authenticated user's account together with its tasks.
///
/// ## Responses:
/// - `204 No Content`: On successful deletion.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If the account no longer exists.
#[delete("/me")]
pub async fn delete_current_user(
    identity: web::Data<IdentityService>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    identity.delete_user(user_id.0).await?;
    Ok(HttpResponse::NoContent().finish())
}
