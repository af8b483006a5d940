use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;

use taskpad::auth::TokenKeys;
use taskpad::cache::RedisVerificationCache;
use taskpad::config::Config;
use taskpad::mailer::{HttpMailer, LogMailer, Mailer};
use taskpad::repository::{PgTaskRepository, PgUserRepository};
use taskpad::routes::{self, health};
use taskpad::services::{IdentityService, IdentitySettings, TaskService};

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| startup_error("invalid configuration", e))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|e| startup_error("failed to connect to database", e))?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| startup_error("failed to run migrations", e))?;

    let cache = RedisVerificationCache::connect(&config.redis_url)
        .await
        .map_err(|e| startup_error("failed to connect to redis", e))?;

    let mailer: Arc<dyn Mailer> = match &config.mail_api_url {
        Some(url) => Arc::new(HttpMailer::new(url.clone(), config.mail_from.clone())),
        None => {
            log::warn!("MAIL_API_URL not set; verification codes will only be logged");
            Arc::new(LogMailer)
        }
    };

    let tokens = TokenKeys::new(&config.jwt_secret, config.token_expiry_hours);
    let identity = web::Data::new(IdentityService::new(
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(cache),
        mailer,
        tokens.clone(),
        IdentitySettings::from_config(&config),
    ));
    let tasks = web::Data::new(TaskService::new(Arc::new(PgTaskRepository::new(pool))));
    let tokens = web::Data::new(tokens);

    log::info!("Starting server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(identity.clone())
            .app_data(tasks.clone())
            .app_data(tokens.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health::health)
            .service(web::scope("/api").configure(routes::config))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
