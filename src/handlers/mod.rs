pub mod choices;
pub mod polls;

use actix_web::http::header;
use actix_web::web::{Data, Form, Query};
use actix_web::HttpResponse;
use serde::Deserialize;
use serde_json::json;
use sqlx::{query, query_as};

use crate::auth::{self, SessionSecret};
use crate::db::DbPool;
use crate::error::Error;
use crate::forms::RegistrationForm;
use crate::models::user::User;
use crate::request::NextQuery;
use crate::response::{redirect_with_notice, Notice, DEFAULT_REDIRECT};

#[derive(Debug, Deserialize)]
pub struct Login {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login_form() -> HttpResponse {
    HttpResponse::Ok().json(json!({}))
}

pub async fn login(
    Form(Login { username, password }): Form<Login>,
    Query(NextQuery { next }): Query<NextQuery>,
    secret: Data<SessionSecret>,
    db: Data<DbPool>,
) -> Result<HttpResponse, Error> {
    let mut conn = db.acquire().await?;
    if let Some(user) =
        query_as::<_, User>("SELECT id, username, email, password, salt FROM users WHERE username = $1")
            .bind(&username)
            .fetch_optional(&mut conn)
            .await?
    {
        if auth::verify_password(&password, &user.salt, &user.password) {
            let token = auth::issue_token(user.id, &secret.0)?;
            // only site-relative targets, and browsers treat /\ like //
            let target = next
                .as_deref()
                .filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.starts_with("/\\"))
                .unwrap_or(DEFAULT_REDIRECT);
            return Ok(HttpResponse::Found()
                .append_header((header::LOCATION, target.to_owned()))
                .cookie(auth::session_cookie(token))
                .finish());
        }
    }
    Ok(HttpResponse::Unauthorized().json(json!({
        "notice": Notice::error("invalid username or password"),
    })))
}

pub async fn logout() -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, "/login"))
        .cookie(auth::clear_session_cookie())
        .finish()
}

pub async fn register_form() -> HttpResponse {
    HttpResponse::Ok().json(json!({}))
}

pub async fn register(Form(form): Form<RegistrationForm>, db: Data<DbPool>) -> Result<HttpResponse, Error> {
    let mut conn = db.acquire().await?;
    let new_user = match form.validate(&mut conn).await? {
        Ok(new_user) => new_user,
        Err(errors) => return Ok(HttpResponse::BadRequest().json(errors)),
    };
    let slt = auth::random_salt();
    query("INSERT INTO users (username, email, password, salt) VALUES ($1, $2, $3, $4)")
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(auth::hash_password(&new_user.password, &slt))
        .bind(&slt)
        .execute(&mut conn)
        .await?;
    Ok(redirect_with_notice(
        "/login",
        Notice::success(format!("thanks for registering {}", new_user.username)),
    ))
}
