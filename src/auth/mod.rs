pub mod extractors;
pub mod middleware;
pub mod otp;
pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};

use crate::models::User;

// Re-export necessary items
pub use extractors::AuthenticatedUserId;
pub use middleware::AuthMiddleware;
pub use otp::generate_code;
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenKeys};

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Represents the payload for a new user registration request.
///
/// Fields are validated by the identity service, in order: email, password, username.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Asks for a verification code to be emailed to `email`.
#[derive(Debug, Deserialize)]
pub struct StartVerificationRequest {
    pub email: String,
}

/// Submits a verification code received by email.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub code: String,
}

/// Response structure after a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The JWT (JSON Web Token) for session authentication.
    pub token: String,
    /// The authenticated user.
    pub user: User,
}
