//! Persistence ports for users and tasks.
//!
//! Services hold these as `Arc<dyn ...>` so the Postgres implementations can be
//! swapped for the in-memory store in tests and local runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{NewTask, NewUser, Task, TaskInput, User};

pub use memory::MemoryStore;
pub use postgres::{PgTaskRepository, PgUserRepository};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a new, unverified user. A duplicate email is `AppError::Conflict`.
    async fn create_user(&self, user: &NewUser) -> Result<User, AppError>;

    /// Fails with `AppError::UserNotFound` when absent.
    async fn get_user_by_id(&self, id: i64) -> Result<User, AppError>;

    /// Fails with `AppError::UserNotFound` when absent.
    async fn get_user_by_email(&self, email: &str) -> Result<User, AppError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    /// Persists `username`, `password_hash` and `is_verified` of `user`.
    async fn update_user(&self, user: &User) -> Result<(), AppError>;

    /// Removes the user and every task they own.
    async fn delete_user(&self, id: i64) -> Result<(), AppError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Inserts a task. An unknown owner is `AppError::UserNotFound`.
    async fn create_task(&self, task: &NewTask) -> Result<Task, AppError>;

    /// All tasks owned by `user_id`, by ascending id.
    async fn list_tasks_by_user(&self, user_id: i64) -> Result<Vec<Task>, AppError>;

    /// Overwrites the editable fields of a task owned by `user_id`.
    ///
    /// Completing a task stamps `completed_at` (kept if already set); reopening it
    /// clears the stamp. A missing or foreign task is `AppError::NotFound`.
    async fn update_task(
        &self,
        user_id: i64,
        task_id: i64,
        changes: &TaskInput,
    ) -> Result<Task, AppError>;

    /// A missing or foreign task is `AppError::NotFound`.
    async fn delete_task(&self, user_id: i64, task_id: i64) -> Result<(), AppError>;
}

pub(crate) fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}
