use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use crate::error::AppError;

/// The closed set of task categories.
/// Stored lowercase; parsing is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskTag {
    Study,
    Work,
    Others,
}

impl TaskTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskTag::Study => "study",
            TaskTag::Work => "work",
            TaskTag::Others => "others",
        }
    }
}

impl fmt::Display for TaskTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskTag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "study" => Ok(TaskTag::Study),
            "work" => Ok(TaskTag::Work),
            "others" => Ok(TaskTag::Others),
            _ => Err(()),
        }
    }
}

fn validate_tag(tag: &str) -> Result<(), ValidationError> {
    match tag.parse::<TaskTag>() {
        Ok(_) => Ok(()),
        Err(_) => {
            let mut err = ValidationError::new("tag");
            err.message = Some("tag must be one of study, work, others".into());
            Err(err)
        }
    }
}

/// Input structure for creating or updating a task.
///
/// `is_completed` is ignored on creation: new tasks always start incomplete.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// Must be at least 3 characters.
    #[validate(length(min = 3, message = "name must be at least 3 characters"))]
    pub name: String,

    /// Must be at least 3 characters.
    #[validate(length(min = 3, message = "description must be at least 3 characters"))]
    pub description: String,

    /// One of `study`, `work`, `others`, in any case.
    #[validate(custom = "validate_tag")]
    pub tag: String,

    /// `true` for high priority.
    #[serde(default)]
    pub priority: bool,

    #[serde(default)]
    pub is_completed: bool,

    pub due_at: DateTime<Utc>,
}

impl TaskInput {
    /// Validates the input and rewrites its tag in canonical lowercase form.
    pub fn normalized(mut self) -> Result<Self, AppError> {
        self.validate()?;
        if let Ok(tag) = self.tag.parse::<TaskTag>() {
            self.tag = tag.to_string();
        }
        Ok(self)
    }
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    /// Identifier of the user who owns the task.
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub tag: String,
    pub priority: bool,
    pub is_completed: bool,
    pub due_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Set when the task is marked completed, cleared when it is reopened.
    pub completed_at: Option<DateTime<Utc>>,
}

/// A task about to be inserted; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub tag: String,
    pub priority: bool,
    pub is_completed: bool,
    pub due_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl NewTask {
    /// Builds an incomplete task for `user_id`, created now.
    pub fn new(input: TaskInput, user_id: i64) -> Self {
        Self {
            user_id,
            name: input.name,
            description: input.description,
            tag: input.tag,
            priority: input.priority,
            is_completed: false,
            due_at: input.due_at,
            created_at: Utc::now(),
        }
    }
}

/// Filters for listing tasks, built from (possibly repeated) query parameters.
///
/// Keys are combined with AND. Within `id` and `tag` any listed value matches.
/// `is_completed` and `priority` only look at their first value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub is_completed: Vec<String>,
    pub priority: Vec<String>,
    pub ids: Vec<String>,
    pub tags: Vec<String>,
}

impl TaskFilter {
    /// Collects the recognised keys from query pairs; unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut filter = TaskFilter::default();
        for (key, value) in pairs {
            let target = match key.as_ref() {
                "is_completed" => &mut filter.is_completed,
                "priority" => &mut filter.priority,
                "id" => &mut filter.ids,
                "tag" => &mut filter.tags,
                _ => continue,
            };
            target.push(value.into());
        }
        filter
    }

    /// Keeps the tasks matching every filter, preserving their order.
    ///
    /// Fails with a validation error if an `id` value is not an integer, whether or
    /// not any task would have been compared against it.
    pub fn apply(&self, tasks: Vec<Task>) -> Result<Vec<Task>, AppError> {
        let ids = self.parsed_ids()?;

        Ok(tasks
            .into_iter()
            .filter(|task| {
                flag_matches(&self.is_completed, task.is_completed)
                    && flag_matches(&self.priority, task.priority)
                    && (ids.is_empty() || ids.contains(&task.id))
                    && (self.tags.is_empty() || self.tags.iter().any(|tag| *tag == task.tag))
            })
            .collect())
    }

    fn parsed_ids(&self) -> Result<Vec<i64>, AppError> {
        self.ids
            .iter()
            .map(|id| {
                id.parse::<i64>()
                    .map_err(|_| AppError::validation("id", format!("'{}' is not a task id", id)))
            })
            .collect()
    }
}

fn flag_matches(filter: &[String], value: bool) -> bool {
    match filter.first() {
        Some(expected) => value.to_string() == *expected,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn input(tag: &str) -> TaskInput {
        TaskInput {
            name: "Test Task".to_string(),
            description: "Test Description".to_string(),
            tag: tag.to_string(),
            priority: true,
            is_completed: true,
            due_at: Utc::now(),
        }
    }

    fn task(id: i64, tag: &str, is_completed: bool, priority: bool) -> Task {
        let now = Utc::now();
        Task {
            id,
            user_id: 1,
            name: format!("task {}", id),
            description: "something to do".to_string(),
            tag: tag.to_string(),
            priority,
            is_completed,
            due_at: now,
            created_at: now,
            completed_at: None,
        }
    }

    fn ids(tasks: &[Task]) -> Vec<i64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_new_task_is_incomplete() {
        let task = NewTask::new(input("work"), 1);
        assert_eq!(task.name, "Test Task");
        assert_eq!(task.user_id, 1);
        assert!(!task.is_completed);
        assert!(task.priority);
    }

    #[test]
    fn test_task_validation() {
        assert!(input("work").validate().is_ok());
        assert!(input("Study").validate().is_ok());
        assert!(input("OTHERS").validate().is_ok());
        assert!(input("hobby").validate().is_err());

        let mut short_name = input("work");
        short_name.name = "ab".to_string();
        assert!(short_name.validate().is_err());

        let mut short_description = input("work");
        short_description.description = "ab".to_string();
        assert!(short_description.validate().is_err());
    }

    #[test]
    fn test_normalized_lowercases_tag() {
        let normalized = input("Study").normalized().unwrap();
        assert_eq!(normalized.tag, "study");

        match input("hobby").normalized() {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "tag"),
            other => panic!("expected a tag validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_filter_from_pairs() {
        let filter = TaskFilter::from_pairs(vec![
            ("tag", "work"),
            ("tag", "study"),
            ("is_completed", "true"),
            ("page", "2"),
        ]);
        assert_eq!(
            filter,
            TaskFilter {
                is_completed: vec!["true".to_string()],
                priority: vec![],
                ids: vec![],
                tags: vec!["work".to_string(), "study".to_string()],
            }
        );
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let tasks = vec![task(1, "work", true, false), task(2, "study", false, true)];
        let result = TaskFilter::default().apply(tasks).unwrap();
        assert_eq!(ids(&result), vec![1, 2]);
    }

    #[test]
    fn test_filter_combines_keys_with_and() {
        let tasks = vec![
            task(1, "work", true, false),
            task(2, "study", false, false),
            task(3, "others", true, false),
        ];
        let filter = TaskFilter::from_pairs(vec![
            ("tag", "work"),
            ("tag", "study"),
            ("is_completed", "true"),
        ]);
        assert_eq!(ids(&filter.apply(tasks).unwrap()), vec![1]);
    }

    #[test]
    fn test_filter_ids_match_any() {
        let tasks = vec![
            task(1, "work", false, false),
            task(2, "work", false, true),
            task(3, "work", false, true),
        ];
        let filter = TaskFilter::from_pairs(vec![("id", "1"), ("id", "3")]);
        assert_eq!(ids(&filter.apply(tasks.clone()).unwrap()), vec![1, 3]);

        let filter = TaskFilter::from_pairs(vec![("id", "3"), ("priority", "true")]);
        assert_eq!(ids(&filter.apply(tasks).unwrap()), vec![3]);
    }

    #[test]
    fn test_flag_filter_uses_first_value_verbatim() {
        let tasks = vec![task(1, "work", true, false), task(2, "work", false, false)];

        let filter = TaskFilter::from_pairs(vec![("is_completed", "false"), ("is_completed", "true")]);
        assert_eq!(ids(&filter.apply(tasks.clone()).unwrap()), vec![2]);

        // "TRUE" is not the canonical formatting of a boolean.
        let filter = TaskFilter::from_pairs(vec![("is_completed", "TRUE")]);
        assert!(filter.apply(tasks).unwrap().is_empty());
    }

    #[test]
    fn test_tag_filter_is_exact() {
        let tasks = vec![task(1, "work", false, false)];
        let filter = TaskFilter::from_pairs(vec![("tag", "Work")]);
        assert!(filter.apply(tasks).unwrap().is_empty());
    }

    #[test]
    fn test_non_numeric_id_is_rejected() {
        let filter = TaskFilter::from_pairs(vec![("id", "abc")]);
        match filter.apply(Vec::new()) {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "id"),
            other => panic!("expected an id validation error, got {:?}", other),
        }
    }
}
