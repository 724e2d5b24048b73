use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub struct Vote {
    pub id: i64,
    pub user_id: i64,
    pub poll_id: i64,
    pub choice_id: i64,
}
