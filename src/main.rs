mod auth;
mod context;
mod db;
mod error;
mod forms;
mod handlers;
mod middlewares;
pub mod models;
pub mod request;
pub mod response;

use actix_web::web::{get, post, scope, Data, ServiceConfig};
use actix_web::{App, HttpServer};
use anyhow::Context as _;

use auth::SessionSecret;
use middlewares::session::SessionGuard;

pub fn routes(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("register")
            .route("", get().to(handlers::register_form))
            .route("", post().to(handlers::register)),
    )
    .service(
        scope("login")
            .route("", get().to(handlers::login_form))
            .route("", post().to(handlers::login)),
    )
    .service(scope("logout").route("", post().to(handlers::logout)))
    .service(
        scope("polls")
            .wrap(SessionGuard)
            .route("", get().to(handlers::polls::list))
            .service(
                scope("add")
                    .route("", get().to(handlers::polls::add_form))
                    .route("", post().to(handlers::polls::create)),
            )
            .service(
                scope("{poll_id}")
                    .route("", get().to(handlers::polls::detail))
                    .route("vote", post().to(handlers::polls::vote))
                    .route("edit", get().to(handlers::polls::edit_form))
                    .route("edit", post().to(handlers::polls::edit))
                    .route("delete", get().to(handlers::polls::delete_form))
                    .route("delete", post().to(handlers::polls::delete))
                    .route("choices/add", get().to(handlers::choices::add_form))
                    .route("choices/add", post().to(handlers::choices::add)),
            ),
    )
    .service(
        scope("choices").wrap(SessionGuard).service(
            scope("{choice_id}")
                .route("edit", get().to(handlers::choices::edit_form))
                .route("edit", post().to(handlers::choices::edit))
                .route("delete", get().to(handlers::choices::delete_form))
                .route("delete", post().to(handlers::choices::delete)),
        ),
    );
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(
        env_logger::Env::default().default_filter_or("actix_web=info,pollbox=info"),
    );
    let database_url = dotenv::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:pollbox.db".into());
    let secret = dotenv::var("JWT_SECRET").context("environment variable JWT_SECRET not been set")?;
    let bind_addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());

    let pool = db::create_pool(&database_url, 5).await?;
    db::run_migrations(&pool).await?;

    let secret = SessionSecret(secret.into_bytes());
    log::info!("listening on {}", bind_addr);
    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(secret.clone()))
            .configure(routes)
    })
    .bind(&bind_addr)?
    .run()
    .await?;
    Ok(())
}
