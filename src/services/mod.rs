pub mod identity;
pub mod tasks;

pub use identity::{IdentityService, IdentitySettings};
pub use tasks::TaskService;
