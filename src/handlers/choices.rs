use actix_web::web::{Data, Form, Path};
use actix_web::HttpResponse;
use serde_json::json;
use sqlx::pool::PoolConnection;
use sqlx::{query, query_as, Sqlite};

use crate::context::UserInfo;
use crate::db::DbPool;
use crate::error::Error;
use crate::forms::ChoiceForm;
use crate::handlers::polls::fetch_poll;
use crate::models::choice::Choice;
use crate::response::{redirect, redirect_with_notice, Notice, DEFAULT_REDIRECT};

async fn fetch_choice(conn: &mut PoolConnection<Sqlite>, choice_id: i64) -> Result<Option<Choice>, Error> {
    let choice = query_as("SELECT id, poll_id, choice_text FROM choices WHERE id = $1")
        .bind(choice_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(choice)
}

pub async fn add_form(
    user: UserInfo,
    poll_id: Path<(i64,)>,
    db: Data<DbPool>,
) -> Result<HttpResponse, Error> {
    let poll_id = poll_id.into_inner().0;
    let mut conn = db.acquire().await?;
    let poll = fetch_poll(&mut conn, poll_id).await?.ok_or(Error::NotFound("poll"))?;
    if poll.owner_id != user.id {
        return Ok(redirect(DEFAULT_REDIRECT));
    }
    Ok(HttpResponse::Ok().json(json!({ "poll": poll })))
}

pub async fn add(
    user: UserInfo,
    poll_id: Path<(i64,)>,
    Form(form): Form<ChoiceForm>,
    db: Data<DbPool>,
) -> Result<HttpResponse, Error> {
    let poll_id = poll_id.into_inner().0;
    let mut conn = db.acquire().await?;
    let poll = fetch_poll(&mut conn, poll_id).await?.ok_or(Error::NotFound("poll"))?;
    if poll.owner_id != user.id {
        return Ok(redirect(DEFAULT_REDIRECT));
    }
    let choice_text = match form.validate() {
        Ok(choice_text) => choice_text,
        Err(errors) => return Ok(HttpResponse::BadRequest().json(errors)),
    };
    query("INSERT INTO choices (poll_id, choice_text) VALUES ($1, $2)")
        .bind(poll_id)
        .bind(&choice_text)
        .execute(&mut conn)
        .await?;
    Ok(redirect_with_notice(DEFAULT_REDIRECT, Notice::success("choice added")))
}

pub async fn edit_form(
    user: UserInfo,
    choice_id: Path<(i64,)>,
    db: Data<DbPool>,
) -> Result<HttpResponse, Error> {
    let choice_id = choice_id.into_inner().0;
    let mut conn = db.acquire().await?;
    let choice = fetch_choice(&mut conn, choice_id).await?.ok_or(Error::NotFound("choice"))?;
    let poll = fetch_poll(&mut conn, choice.poll_id).await?.ok_or(Error::NotFound("poll"))?;
    if poll.owner_id != user.id {
        return Ok(redirect(DEFAULT_REDIRECT));
    }
    Ok(HttpResponse::Ok().json(json!({ "choice": choice, "edit_mode": true })))
}

pub async fn edit(
    user: UserInfo,
    choice_id: Path<(i64,)>,
    Form(form): Form<ChoiceForm>,
    db: Data<DbPool>,
) -> Result<HttpResponse, Error> {
    let choice_id = choice_id.into_inner().0;
    let mut conn = db.acquire().await?;
    let choice = fetch_choice(&mut conn, choice_id).await?.ok_or(Error::NotFound("choice"))?;
    let poll = fetch_poll(&mut conn, choice.poll_id).await?.ok_or(Error::NotFound("poll"))?;
    if poll.owner_id != user.id {
        return Ok(redirect(DEFAULT_REDIRECT));
    }
    let choice_text = match form.validate() {
        Ok(choice_text) => choice_text,
        Err(errors) => return Ok(HttpResponse::BadRequest().json(errors)),
    };
    query("UPDATE choices SET choice_text = $1 WHERE id = $2")
        .bind(&choice_text)
        .bind(choice_id)
        .execute(&mut conn)
        .await?;
    Ok(redirect_with_notice(DEFAULT_REDIRECT, Notice::success("choice updated")))
}

pub async fn delete_form(
    user: UserInfo,
    choice_id: Path<(i64,)>,
    db: Data<DbPool>,
) -> Result<HttpResponse, Error> {
    let choice_id = choice_id.into_inner().0;
    let mut conn = db.acquire().await?;
    let choice = fetch_choice(&mut conn, choice_id).await?.ok_or(Error::NotFound("choice"))?;
    let poll = fetch_poll(&mut conn, choice.poll_id).await?.ok_or(Error::NotFound("poll"))?;
    if poll.owner_id != user.id {
        return Ok(redirect(DEFAULT_REDIRECT));
    }
    Ok(HttpResponse::Ok().json(json!({ "choice": choice })))
}

pub async fn delete(
    user: UserInfo,
    choice_id: Path<(i64,)>,
    db: Data<DbPool>,
) -> Result<HttpResponse, Error> {
    let choice_id = choice_id.into_inner().0;
    let mut conn = db.acquire().await?;
    let choice = fetch_choice(&mut conn, choice_id).await?.ok_or(Error::NotFound("choice"))?;
    let poll = fetch_poll(&mut conn, choice.poll_id).await?.ok_or(Error::NotFound("poll"))?;
    if poll.owner_id != user.id {
        return Ok(redirect(DEFAULT_REDIRECT));
    }
    query("DELETE FROM choices WHERE id = $1")
        .bind(choice_id)
        .execute(&mut conn)
        .await?;
    Ok(redirect_with_notice(DEFAULT_REDIRECT, Notice::success("choice deleted")))
}
