use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::HttpResponse;
use serde::Serialize;
use url::form_urlencoded;

pub const PAGE_SIZE: i64 = 5;

pub static DEFAULT_REDIRECT: &str = "/polls";
pub static NOTICE_COOKIE: &str = "NOTICE";

#[derive(Debug, Serialize)]
pub struct Page<T> {
    list: Vec<T>,
    total: i64,
    page: i64,
    pages: i64,
    params: String,
    search_term: String,
}

impl<T> Page<T> {
    pub fn new(list: Vec<T>, total: i64, page: i64, pages: i64, params: String, search_term: String) -> Self {
        Page {
            list,
            total,
            page,
            pages,
            params,
            search_term,
        }
    }
}

pub fn pages_for(total: i64) -> i64 {
    ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1)
}

// out-of-range and unparsable page numbers fall back into the valid range
pub fn clamp_page(requested: Option<i64>, pages: i64) -> i64 {
    requested.unwrap_or(1).clamp(1, pages)
}

// one-shot flash message, carried to the next page in a cookie the
// frontend reads and clears
#[derive(Debug, Serialize)]
pub struct Notice {
    kind: &'static str,
    message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            kind: "success",
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            kind: "error",
            message: message.into(),
        }
    }

    pub fn cookie(&self) -> Cookie<'static> {
        let value: String =
            form_urlencoded::byte_serialize(format!("{}:{}", self.kind, self.message).as_bytes()).collect();
        Cookie::build(NOTICE_COOKIE, value).path("/").finish()
    }
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, location.to_owned()))
        .finish()
}

pub fn redirect_with_notice(location: &str, notice: Notice) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, location.to_owned()))
        .cookie(notice.cookie())
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up_and_never_drops_below_one() {
        assert_eq!(pages_for(0), 1);
        assert_eq!(pages_for(1), 1);
        assert_eq!(pages_for(5), 1);
        assert_eq!(pages_for(6), 2);
        assert_eq!(pages_for(11), 3);
    }

    #[test]
    fn requested_pages_are_clamped_into_range() {
        assert_eq!(clamp_page(None, 3), 1);
        assert_eq!(clamp_page(Some(0), 3), 1);
        assert_eq!(clamp_page(Some(-2), 3), 1);
        assert_eq!(clamp_page(Some(2), 3), 2);
        assert_eq!(clamp_page(Some(99), 3), 3);
    }

    #[test]
    fn notice_cookie_is_url_encoded() {
        let cookie = Notice::error("no choice was selected").cookie();
        assert_eq!(cookie.name(), NOTICE_COOKIE);
        assert_eq!(cookie.value(), "error%3Ano+choice+was+selected");
    }

    #[test]
    fn redirect_sets_the_location_header() {
        let resp = redirect("/polls/7");
        assert_eq!(resp.status(), actix_web::http::StatusCode::FOUND);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/polls/7");
    }
}
