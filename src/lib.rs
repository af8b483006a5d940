#![doc = "The `taskpad` library crate."]
#![doc = ""]
#![doc = "This crate contains the identity service (registration, email verification,"]
#![doc = "login), the task service, their storage and cache adapters, and the actix-web"]
#![doc = "routes used by the main binary (`main.rs`) to run the application."]

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod mailer;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;

pub use crate::error::AppError;
pub use crate::models::{Task, TaskFilter, TaskInput, User};
