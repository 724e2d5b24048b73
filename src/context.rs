use std::future::{ready, Ready};

use actix_web::error::ErrorUnauthorized;
use actix_web::{dev::Payload, Error, FromRequest, HttpMessage, HttpRequest};

// current user, inserted into request extensions by the session middleware
#[derive(Debug, Clone)]
pub struct UserInfo {
    pub id: i64,
}

impl FromRequest for UserInfo {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<Self>() {
            ready(Ok(user.clone()))
        } else {
            ready(Err(ErrorUnauthorized("login required")))
        }
    }
}
