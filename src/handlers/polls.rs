use actix_web::web::{Data, Form, Json, Path, Query};
use actix_web::HttpResponse;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::pool::PoolConnection;
use sqlx::{query, query_as, query_scalar, QueryBuilder, Sqlite};

use crate::context::UserInfo;
use crate::db::{is_snapshot_conflict, is_unique_violation, DbPool};
use crate::error::Error;
use crate::forms::{EditPollForm, PollForm};
use crate::models::poll::{results, ChoiceCount, ChoiceResult, Poll};
use crate::request::PollsQuery;
use crate::response::{
    clamp_page, pages_for, redirect, redirect_with_notice, Notice, Page, DEFAULT_REDIRECT, PAGE_SIZE,
};

pub(crate) async fn fetch_poll(
    conn: &mut PoolConnection<Sqlite>,
    poll_id: i64,
) -> Result<Option<Poll>, Error> {
    let poll = query_as(
        "SELECT p.id, p.owner_id, u.username AS owner, p.text, p.pub_date, COUNT(v.id) AS num_votes
        FROM polls AS p
        JOIN users AS u ON p.owner_id = u.id
        LEFT JOIN votes AS v ON p.id = v.poll_id
        WHERE p.id = $1
        GROUP BY p.id, p.owner_id, u.username, p.text, p.pub_date",
    )
    .bind(poll_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(poll)
}

pub async fn list(
    _user: UserInfo,
    Query(params): Query<PollsQuery>,
    db: Data<DbPool>,
) -> Result<Json<Page<Poll>>, Error> {
    let mut conn = db.acquire().await?;
    let mut total_query = QueryBuilder::new("SELECT COUNT(*) FROM polls WHERE 1 = 1");
    if let Some(term) = &params.search {
        total_query.push(" AND text LIKE ");
        total_query.push_bind(format!("%{}%", term));
    }
    let (total,): (i64,) = total_query.build_query_as().fetch_one(&mut conn).await?;
    let pages = pages_for(total);
    let page = clamp_page(params.requested_page(), pages);

    let mut list_query = QueryBuilder::new(
        "SELECT p.id, p.owner_id, u.username AS owner, p.text, p.pub_date, COUNT(v.id) AS num_votes
        FROM polls AS p
        JOIN users AS u ON p.owner_id = u.id
        LEFT JOIN votes AS v ON p.id = v.poll_id
        WHERE 1 = 1",
    );
    if let Some(term) = &params.search {
        list_query.push(" AND p.text LIKE ");
        list_query.push_bind(format!("%{}%", term));
    }
    list_query.push(" GROUP BY p.id, p.owner_id, u.username, p.text, p.pub_date");
    // later flags override earlier ones, so the strongest sort wins
    if params.num_votes.is_some() {
        list_query.push(" ORDER BY num_votes DESC");
    } else if params.pub_date.is_some() {
        list_query.push(" ORDER BY p.pub_date DESC");
    } else if params.text.is_some() {
        list_query.push(" ORDER BY p.text");
    } else {
        list_query.push(" ORDER BY p.id");
    }
    list_query.push(" LIMIT ");
    list_query.push_bind(PAGE_SIZE);
    list_query.push(" OFFSET ");
    list_query.push_bind((page - 1) * PAGE_SIZE);
    let polls: Vec<Poll> = list_query.build_query_as().fetch_all(&mut conn).await?;

    let search_term = params.search.clone().unwrap_or_default();
    Ok(Json(Page::new(polls, total, page, pages, params.params(), search_term)))
}

pub async fn add_form(_user: UserInfo) -> HttpResponse {
    HttpResponse::Ok().json(json!({}))
}

pub async fn create(
    user: UserInfo,
    Form(form): Form<PollForm>,
    db: Data<DbPool>,
) -> Result<HttpResponse, Error> {
    let new_poll = match form.validate() {
        Ok(new_poll) => new_poll,
        Err(errors) => return Ok(HttpResponse::BadRequest().json(errors)),
    };
    let mut tx = db.begin().await?;
    let (poll_id,): (i64,) = query_as("INSERT INTO polls (owner_id, text, pub_date) VALUES ($1, $2, $3) RETURNING id")
        .bind(user.id)
        .bind(&new_poll.text)
        .bind(Local::now().date_naive())
        .fetch_one(&mut tx)
        .await?;
    QueryBuilder::new("INSERT INTO choices (poll_id, choice_text) ")
        .push_values(new_poll.choices.iter(), |mut b, choice| {
            b.push_bind(poll_id);
            b.push_bind(choice.as_str());
        })
        .build()
        .execute(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(redirect_with_notice(DEFAULT_REDIRECT, Notice::success("poll was added")))
}

#[derive(Debug, Serialize)]
pub struct PollDetail {
    pub poll: Poll,
    pub user_can_vote: bool,
    pub results: Vec<ChoiceResult>,
}

pub async fn detail(
    user: UserInfo,
    poll_id: Path<(i64,)>,
    db: Data<DbPool>,
) -> Result<Json<PollDetail>, Error> {
    let poll_id = poll_id.into_inner().0;
    let mut conn = db.acquire().await?;
    let poll = fetch_poll(&mut conn, poll_id).await?.ok_or(Error::NotFound("poll"))?;
    let counts: Vec<ChoiceCount> = query_as(
        "SELECT c.id, c.choice_text, COUNT(v.id) AS num_votes
        FROM choices AS c
        LEFT JOIN votes AS v ON c.id = v.choice_id
        WHERE c.poll_id = $1
        GROUP BY c.id, c.choice_text
        ORDER BY c.id",
    )
    .bind(poll_id)
    .fetch_all(&mut conn)
    .await?;
    let voted: bool = query_scalar("SELECT EXISTS(SELECT 1 FROM votes WHERE user_id = $1 AND poll_id = $2)")
        .bind(user.id)
        .bind(poll_id)
        .fetch_one(&mut conn)
        .await?;
    Ok(Json(PollDetail {
        poll,
        user_can_vote: !voted,
        results: results(&counts),
    }))
}

#[derive(Debug, Deserialize)]
pub struct VoteForm {
    #[serde(default)]
    pub choice: Option<String>,
}

// whether a failed insert lost the race to a ballot already on the ledger
async fn ballot_already_counted(
    conn: &mut PoolConnection<Sqlite>,
    err: &sqlx::Error,
    user_id: i64,
    poll_id: i64,
) -> Result<bool, Error> {
    if is_unique_violation(err) {
        return Ok(true);
    }
    if !is_snapshot_conflict(err) {
        return Ok(false);
    }
    let voted: bool = query_scalar("SELECT EXISTS(SELECT 1 FROM votes WHERE user_id = $1 AND poll_id = $2)")
        .bind(user_id)
        .bind(poll_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(voted)
}

pub async fn vote(
    user: UserInfo,
    poll_id: Path<(i64,)>,
    Form(form): Form<VoteForm>,
    db: Data<DbPool>,
) -> Result<HttpResponse, Error> {
    let poll_id = poll_id.into_inner().0;
    let detail_url = format!("/polls/{}", poll_id);
    let mut tx = db.begin().await?;
    let known: bool = query_scalar("SELECT EXISTS(SELECT 1 FROM polls WHERE id = $1)")
        .bind(poll_id)
        .fetch_one(&mut tx)
        .await?;
    if !known {
        return Err(Error::NotFound("poll"));
    }
    let voted: bool = query_scalar("SELECT EXISTS(SELECT 1 FROM votes WHERE user_id = $1 AND poll_id = $2)")
        .bind(user.id)
        .bind(poll_id)
        .fetch_one(&mut tx)
        .await?;
    if voted {
        return Ok(redirect_with_notice(
            &detail_url,
            Notice::error("sorry, you have already voted"),
        ));
    }
    let choice_id = match form.choice.as_deref().filter(|c| !c.is_empty()) {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| Error::BadRequest("choice must be an id".into()))?,
        None => {
            return Ok(redirect_with_notice(
                &detail_url,
                Notice::error("no choice was selected"),
            ))
        }
    };
    let known: bool = query_scalar("SELECT EXISTS(SELECT 1 FROM choices WHERE id = $1 AND poll_id = $2)")
        .bind(choice_id)
        .bind(poll_id)
        .fetch_one(&mut tx)
        .await?;
    if !known {
        return Err(Error::NotFound("choice"));
    }
    // the unique index backstops concurrent ballots, and a concurrent
    // commit can stale this transaction's snapshot before the insert
    // upgrades it to a write
    if let Err(e) = query("INSERT INTO votes (user_id, poll_id, choice_id) VALUES ($1, $2, $3)")
        .bind(user.id)
        .bind(poll_id)
        .bind(choice_id)
        .execute(&mut tx)
        .await
    {
        tx.rollback().await?;
        let mut conn = db.acquire().await?;
        if ballot_already_counted(&mut conn, &e, user.id, poll_id).await? {
            return Ok(redirect_with_notice(
                &detail_url,
                Notice::error("sorry, you have already voted"),
            ));
        }
        return Err(e.into());
    }
    tx.commit().await?;
    Ok(redirect(&detail_url))
}

pub async fn edit_form(
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

pub async fn edit(
    user: UserInfo,
    poll_id: Path<(i64,)>,
    Form(form): Form<EditPollForm>,
    db: Data<DbPool>,
) -> Result<HttpResponse, Error> {
    let poll_id = poll_id.into_inner().0;
    let mut conn = db.acquire().await?;
    let poll = fetch_poll(&mut conn, poll_id).await?.ok_or(Error::NotFound("poll"))?;
    if poll.owner_id != user.id {
        return Ok(redirect(DEFAULT_REDIRECT));
    }
    let text = match form.validate() {
        Ok(text) => text,
        Err(errors) => return Ok(HttpResponse::BadRequest().json(errors)),
    };
    query("UPDATE polls SET text = $1 WHERE id = $2")
        .bind(&text)
        .bind(poll_id)
        .execute(&mut conn)
        .await?;
    Ok(redirect_with_notice(DEFAULT_REDIRECT, Notice::success("poll updated")))
}

pub async fn delete_form(
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

pub async fn delete(
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
    query("DELETE FROM polls WHERE id = $1")
        .bind(poll_id)
        .execute(&mut conn)
        .await?;
    Ok(redirect_with_notice(DEFAULT_REDIRECT, Notice::success("poll deleted")))
}
