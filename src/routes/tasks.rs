use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{TaskFilter, TaskInput},
    services::TaskService,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};

/// Retrieves the authenticated user's tasks.
///
/// ## Query Parameters (all optional, keys may repeat):
/// - `is_completed`: `true` or `false`; only the first value is used.
/// - `priority`: `true` or `false`; only the first value is used.
/// - `id`: keep tasks with any of the given ids. Non-numeric ids are rejected.
/// - `tag`: keep tasks with any of the given tags (exact match).
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of `Task` objects, ordered by id.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `422 Unprocessable Entity`: If an `id` value is not a number.
#[get("")]
pub async fn get_tasks(
    tasks: web::Data<TaskService>,
    user_id: AuthenticatedUserId,
    query: web::Query<Vec<(String, String)>>,
) -> Result<impl Responder, AppError> {
    let filter = TaskFilter::from_pairs(query.into_inner());
    let result = tasks.list_tasks(user_id.0, &filter).await?;

    Ok(HttpResponse::Ok().json(result))
}

/// Creates a new task for the authenticated user.
///
/// ## Request Body:
/// A JSON object matching `TaskInput`: `name` and `description` (at least 3
/// characters), `tag` (`study`, `work` or `others`, any case), optional `priority`
/// and the `due_at` timestamp. The task always starts incomplete.
///
/// ## Responses:
/// - `201 Created`: Returns the newly created `Task` object as JSON.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `422 Unprocessable Entity`: If input validation fails.
#[post("")]
pub async fn create_task(
    tasks: web::Data<TaskService>,
    user_id: AuthenticatedUserId,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let task = tasks.add_task(user_id.0, task_data.into_inner()).await?;

    Ok(HttpResponse::Created().json(task))
}

/// Replaces the editable fields of a task owned by the authenticated user.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Task` object as JSON.
/// - `404 Not Found`: If the task does not exist or is not owned by the user.
/// - `422 Unprocessable Entity`: If input validation fails.
#[put("/{id}")]
pub async fn update_task(
    tasks: web::Data<TaskService>,
    user_id: AuthenticatedUserId,
    task_id: web::Path<i64>,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let task = tasks
        .update_task(user_id.0, task_id.into_inner(), task_data.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task owned by the authenticated user.
///
/// ## Responses:
/// - `204 No Content`: On successful deletion.
/// - `404 Not Found`: If the task does not exist or is not owned by the user.
#[delete("/{id}")]
pub async fn delete_task(
    tasks: web::Data<TaskService>,
    user_id: AuthenticatedUserId,
    task_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    tasks.delete_task(user_id.0, task_id.into_inner()).await?;

    Ok(HttpResponse::NoContent().finish())
}
