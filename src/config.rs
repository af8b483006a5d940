use std::env;
use std::str::FromStr;

use thiserror::Error;

/// Upper bound for the OTP and access-token lifetimes: one year.
const MAX_EXPIRY_HOURS: i64 = 24 * 365;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub token_expiry_hours: i64,
    pub otp_expiry_hours: u64,
    pub otp_digits: u32,
    pub bcrypt_cost: u32,
    /// Mail relay endpoint. Codes are only logged when unset.
    pub mail_api_url: Option<String>,
    pub mail_from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                value: String::new(),
            });
        }

        let otp_digits = parsed("OTP_DIGITS", 6)?;
        if !(4..=6).contains(&otp_digits) {
            return Err(ConfigError::Invalid {
                name: "OTP_DIGITS",
                value: otp_digits.to_string(),
            });
        }

        let bcrypt_cost = parsed("BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }

        let token_expiry_hours = parsed("ACCESS_TOKEN_EXPIRY_HOURS", 2)?;
        check_expiry("ACCESS_TOKEN_EXPIRY_HOURS", token_expiry_hours)?;

        let otp_expiry_hours: i64 = parsed("OTP_EXPIRY_HOURS", 1)?;
        check_expiry("OTP_EXPIRY_HOURS", otp_expiry_hours)?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            server_port: parsed("SERVER_PORT", 8080)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            jwt_secret,
            token_expiry_hours,
            otp_expiry_hours: otp_expiry_hours as u64,
            otp_digits,
            bcrypt_cost,
            mail_api_url: env::var("MAIL_API_URL").ok().filter(|url| !url.is_empty()),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@taskpad.local".to_string()),
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn check_expiry(name: &'static str, hours: i64) -> Result<(), ConfigError> {
    if (1..=MAX_EXPIRY_HOURS).contains(&hours) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            name,
            value: hours.to_string(),
        })
    }
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
