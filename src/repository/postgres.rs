use async_trait::async_trait;
use sqlx::PgPool;

use super::{task_not_found, TaskRepository, UserRepository};
use crate::error::AppError;
use crate::models::{NewTask, NewUser, Task, TaskInput, User};

const USER_COLUMNS: &str = "id, email, username, password_hash, is_verified, created_at";
const TASK_COLUMNS: &str = "id, user_id, name, description, tag, priority, is_completed, \
                            due_at, created_at, completed_at";

/// Postgres-backed [`UserRepository`].
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: &NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (email, username, password_hash) VALUES ($1, $2, $3) \
             RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                // Lost a race against a concurrent registration of the same email.
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::Conflict("Email already registered".into())
                }
                other => other.into(),
            })
    }

    async fn get_user_by_id(&self, id: i64) -> Result<User, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, AppError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE users SET username = $1, password_hash = $2, is_verified = $3 WHERE id = $4",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_verified)
        .bind(user.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        // Tasks go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }
}

/// Postgres-backed [`TaskRepository`].
#[derive(Clone)]
pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn create_task(&self, task: &NewTask) -> Result<Task, AppError> {
        let sql = format!(
            "INSERT INTO tasks (user_id, name, description, tag, priority, is_completed, due_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {}",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(task.user_id)
            .bind(&task.name)
            .bind(&task.description)
            .bind(&task.tag)
            .bind(task.priority)
            .bind(task.is_completed)
            .bind(task.due_at)
            .bind(task.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    AppError::UserNotFound
                }
                other => other.into(),
            })
    }

    async fn list_tasks_by_user(&self, user_id: i64) -> Result<Vec<Task>, AppError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE user_id = $1 ORDER BY id ASC",
            TASK_COLUMNS
        );

        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn update_task(
        &self,
        user_id: i64,
        task_id: i64,
        changes: &TaskInput,
    ) -> Result<Task, AppError> {
        let sql = format!(
            "UPDATE tasks \
             SET name = $1, description = $2, tag = $3, priority = $4, is_completed = $5, due_at = $6, \
                 completed_at = CASE WHEN $5 THEN COALESCE(completed_at, NOW()) ELSE NULL END \
             WHERE id = $7 AND user_id = $8 \
             RETURNING {}",
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(&changes.name)
            .bind(&changes.description)
            .bind(&changes.tag)
            .bind(changes.priority)
            .bind(changes.is_completed)
            .bind(changes.due_at)
            .bind(task_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(task_not_found)
    }

    async fn delete_task(&self, user_id: i64, task_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(task_not_found());
        }
        Ok(())
    }
}
