use std::io;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use todolist::{
    auth::{AuthMiddleware, PasswordCodec, TokenService},
    config::Config,
    routes::{self, health},
    services::{TaskService, UserService},
    store::{
        postgres, InMemoryTaskStore, InMemoryUserStore, PgTaskStore, PgUserStore, TaskStore,
        UserStore,
    },
};

fn startup_error(err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(startup_error)?;
    let tokens = TokenService::from_config(&config).map_err(startup_error)?;
    let store_timeout = Duration::from_secs(config.store_timeout_secs);

    let (task_store, user_store): (Arc<dyn TaskStore>, Arc<dyn UserStore>) =
        match &config.database_url {
            Some(url) => {
                let pool = postgres::connect(url, config.database_max_connections, store_timeout)
                    .await
                    .map_err(startup_error)?;
                postgres::migrate(&pool).await.map_err(startup_error)?;
                log::info!("using the Postgres store");
                (
                    Arc::new(PgTaskStore::new(pool.clone(), store_timeout)),
                    Arc::new(PgUserStore::new(pool, store_timeout)),
                )
            }
            None => {
                log::warn!("DATABASE_URL is not set, data is kept in memory only");
                (
                    Arc::new(InMemoryTaskStore::new()),
                    Arc::new(InMemoryUserStore::new()),
                )
            }
        };

    let task_service = TaskService::new(task_store);
    let user_service = UserService::new(
        user_store,
        task_service.clone(),
        tokens.clone(),
        PasswordCodec::new(config.bcrypt_cost),
    );

    let tasks = web::Data::new(task_service);
    let users = web::Data::new(user_service);
    let cors_origins = config.cors_allowed_origins.clone();

    log::info!("Starting todolist server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(tasks.clone())
            .app_data(users.clone())
            .wrap(routes::cors_policy(&cors_origins))
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api/v1")
                    .wrap(AuthMiddleware::new(tokens.clone()))
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
