use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::task::{Context, Poll};

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::ErrorInternalServerError;
use actix_web::http::header;
use actix_web::web::Data;
use actix_web::{Error, HttpMessage, HttpResponse};
use url::form_urlencoded;

use crate::auth::{self, SessionSecret, SESSION_TOKEN};
use crate::context::UserInfo;

// guards a scope, bouncing anonymous requests to the login page with a
// next parameter pointing back at the original url
pub struct SessionGuard;

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SessionService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionService { next_service: service }))
    }
}

pub struct SessionService<S> {
    next_service: S,
}

impl<S, B> Service<ServiceRequest> for SessionService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next_service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let secret = match req.app_data::<Data<SessionSecret>>() {
            Some(secret) => secret.clone(),
            None => {
                return Box::pin(ready(Err(ErrorInternalServerError(
                    "session secret not configured",
                ))))
            }
        };
        let verified = req
            .cookie(SESSION_TOKEN)
            .and_then(|cookie| auth::verify_token(cookie.value(), &secret.0).ok());
        match verified {
            Some(id) => {
                req.extensions_mut().insert(UserInfo { id });
                let res_fut = self.next_service.call(req);
                Box::pin(async move { Ok(res_fut.await?.map_into_left_body()) })
            }
            None => {
                let resp = login_redirect(&req);
                Box::pin(ready(Ok(req.into_response(resp).map_into_right_body())))
            }
        }
    }
}

fn login_redirect(req: &ServiceRequest) -> HttpResponse {
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| req.uri().path());
    let next: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
    HttpResponse::Found()
        .append_header((header::LOCATION, format!("/login?next={}", next)))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{cookie::Cookie, test, web, App};

    async fn whoami(user: UserInfo) -> HttpResponse {
        HttpResponse::Ok().body(user.id.to_string())
    }

    #[actix_web::test]
    async fn anonymous_requests_bounce_to_login_with_next() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(SessionSecret(b"mw-secret".to_vec())))
                .service(web::scope("/polls").wrap(SessionGuard).route("", web::get().to(whoami))),
        )
        .await;
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/polls?page=2").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = resp.headers().get(header::LOCATION).unwrap().to_str().unwrap();
        assert_eq!(location, "/login?next=%2Fpolls%3Fpage%3D2");
    }

    #[actix_web::test]
    async fn a_garbage_token_is_treated_as_anonymous() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(SessionSecret(b"mw-secret".to_vec())))
                .service(web::scope("/polls").wrap(SessionGuard).route("", web::get().to(whoami))),
        )
        .await;
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/polls")
                .cookie(Cookie::new(SESSION_TOKEN, "garbage"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FOUND);
    }

    #[actix_web::test]
    async fn a_valid_token_reaches_the_handler_with_its_user() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(SessionSecret(b"mw-secret".to_vec())))
                .service(web::scope("/polls").wrap(SessionGuard).route("", web::get().to(whoami))),
        )
        .await;
        let token = auth::issue_token(7, b"mw-secret").unwrap();
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/polls")
                .cookie(Cookie::new(SESSION_TOKEN, token))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(&test::read_body(resp).await[..], b"7");
    }
}
