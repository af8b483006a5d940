pub mod task;
pub mod user;

pub use task::{NewTask, Task, TaskFilter, TaskInput, TaskTag};
pub use user::{NewUser, User};
