use std::ops::Add;

use actix_web::cookie::{time::Duration as CookieDuration, time::OffsetDateTime, Cookie, CookieBuilder};
use hex::ToHex;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Error;

pub static SESSION_TOKEN: &str = "SESSION_TOKEN";

const SESSION_DAYS: i64 = 30;

// shared application state handed to the session middleware and login handler
#[derive(Clone)]
pub struct SessionSecret(pub Vec<u8>);

#[derive(Debug, Deserialize, Serialize)]
pub struct Claim {
    pub user: String,
    pub exp: i64,
}

pub fn hash_password(pass: &str, slt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pass);
    hasher.update(slt);
    hasher.finalize().encode_hex()
}

pub fn verify_password(pass: &str, slt: &str, hashed: &str) -> bool {
    hash_password(pass, slt) == hashed
}

pub fn random_salt() -> String {
    const CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut rng = thread_rng();
    (0..32).map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char).collect()
}

pub fn issue_token(user_id: i64, secret: &[u8]) -> Result<String, Error> {
    let claim = Claim {
        user: user_id.to_string(),
        exp: chrono::Utc::now().add(chrono::Duration::days(SESSION_DAYS)).timestamp(),
    };
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret);
    let token = encode(&header, &claim, &key)?;
    Ok(token)
}

pub fn verify_token(token: &str, secret: &[u8]) -> Result<i64, Error> {
    let key = DecodingKey::from_secret(secret);
    let validation = Validation::new(Algorithm::HS256);
    let payload = decode::<Claim>(token, &key, &validation)?;
    payload.claims.user.parse::<i64>().map_err(|_| Error::InvalidToken)
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    CookieBuilder::new(SESSION_TOKEN, token)
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::days(SESSION_DAYS))
        .finish()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    CookieBuilder::new(SESSION_TOKEN, "")
        .path("/")
        .expires(OffsetDateTime::now_utc())
        .finish()
}
