use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{task_not_found, TaskRepository, UserRepository};
use crate::error::AppError;
use crate::models::{NewTask, NewUser, Task, TaskInput, User};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    next_user_id: i64,
    next_task_id: i64,
}

/// In-process store implementing both repositories over shared tables, so that
/// deleting a user also drops their tasks. Ids start at 1 and are never reused.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Storage("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &NewUser) -> Result<User, AppError> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered".into()));
        }

        tables.next_user_id += 1;
        let created = User {
            id: tables.next_user_id,
            email: user.email.clone(),
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            is_verified: false,
            created_at: Utc::now(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<User, AppError> {
        self.lock()?
            .users
            .get(&id)
            .cloned()
            .ok_or(AppError::UserNotFound)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, AppError> {
        self.lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(AppError::UserNotFound)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.lock()?.users.values().any(|u| u.email == email))
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        let stored = tables.users.get_mut(&user.id).ok_or(AppError::UserNotFound)?;
        stored.username = user.username.clone();
        stored.password_hash = user.password_hash.clone();
        stored.is_verified = user.is_verified;
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        if tables.users.remove(&id).is_none() {
            return Err(AppError::UserNotFound);
        }
        tables.tasks.retain(|_, task| task.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn create_task(&self, task: &NewTask) -> Result<Task, AppError> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&task.user_id) {
            return Err(AppError::UserNotFound);
        }

        tables.next_task_id += 1;
        let created = Task {
            id: tables.next_task_id,
            user_id: task.user_id,
            name: task.name.clone(),
            description: task.description.clone(),
            tag: task.tag.clone(),
            priority: task.priority,
            is_completed: task.is_completed,
            due_at: task.due_at,
            created_at: task.created_at,
            completed_at: None,
        };
        tables.tasks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_tasks_by_user(&self, user_id: i64) -> Result<Vec<Task>, AppError> {
        Ok(self
            .lock()?
            .tasks
            .values()
            .filter(|task| task.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_task(
        &self,
        user_id: i64,
        task_id: i64,
        changes: &TaskInput,
    ) -> Result<Task, AppError> {
        let mut tables = self.lock()?;
        let task = tables
            .tasks
            .get_mut(&task_id)
            .filter(|task| task.user_id == user_id)
            .ok_or_else(task_not_found)?;

        task.name = changes.name.clone();
        task.description = changes.description.clone();
        task.tag = changes.tag.clone();
        task.priority = changes.priority;
        task.is_completed = changes.is_completed;
        task.due_at = changes.due_at;
        task.completed_at = if changes.is_completed {
            task.completed_at.or_else(|| Some(Utc::now()))
        } else {
            None
        };
        Ok(task.clone())
    }

    async fn delete_task(&self, user_id: i64, task_id: i64) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        let owned = tables
            .tasks
            .get(&task_id)
            .is_some_and(|task| task.user_id == user_id);
        if !owned {
            return Err(task_not_found());
        }
        tables.tasks.remove(&task_id);
        Ok(())
    }
}
