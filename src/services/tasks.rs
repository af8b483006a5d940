use std::sync::Arc;

use crate::error::AppError;
use crate::models::{NewTask, Task, TaskFilter, TaskInput};
use crate::repository::TaskRepository;

/// Task CRUD scoped to the owning user.
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepository>) -> Self {
        Self { tasks }
    }

    /// Validates `input` and stores it as a new, incomplete task of `user_id`.
    /// The creation time is set here; client-supplied completion is ignored.
    pub async fn add_task(&self, user_id: i64, input: TaskInput) -> Result<Task, AppError> {
        let input = input.normalized()?;
        let task = self.tasks.create_task(&NewTask::new(input, user_id)).await?;
        log::info!("user {} created task {}", user_id, task.id);
        Ok(task)
    }

    /// Tasks of `user_id` matching every filter, in id order.
    pub async fn list_tasks(&self, user_id: i64, filter: &TaskFilter) -> Result<Vec<Task>, AppError> {
        let tasks = self.tasks.list_tasks_by_user(user_id).await?;
        filter.apply(tasks)
    }

    /// Replaces the editable fields of a task, with the same validation as creation.
    pub async fn update_task(
        &self,
        user_id: i64,
        task_id: i64,
        input: TaskInput,
    ) -> Result<Task, AppError> {
        let input = input.normalized()?;
        let task = self.tasks.update_task(user_id, task_id, &input).await?;
        log::info!("user {} updated task {}", user_id, task_id);
        Ok(task)
    }

    pub async fn delete_task(&self, user_id: i64, task_id: i64) -> Result<(), AppError> {
        self.tasks.delete_task(user_id, task_id).await?;
        log::info!("user {} deleted task {}", user_id, task_id);
        Ok(())
    }
}
