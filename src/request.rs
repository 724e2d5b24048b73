use serde::Deserialize;
use url::form_urlencoded;

// listing controls, every field optional so bare flags like ?num_votes work
#[derive(Debug, Default, Deserialize)]
pub struct PollsQuery {
    pub text: Option<String>,
    pub pub_date: Option<String>,
    pub num_votes: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
}

impl PollsQuery {
    // query string echoed back for page links, minus the page number itself
    pub fn params(&self) -> String {
        let mut enc = form_urlencoded::Serializer::new(String::new());
        if let Some(text) = &self.text {
            enc.append_pair("text", text);
        }
        if let Some(pub_date) = &self.pub_date {
            enc.append_pair("pub_date", pub_date);
        }
        if let Some(num_votes) = &self.num_votes {
            enc.append_pair("num_votes", num_votes);
        }
        if let Some(search) = &self.search {
            enc.append_pair("search", search);
        }
        enc.finish()
    }

    pub fn requested_page(&self) -> Option<i64> {
        self.page.as_deref().and_then(|p| p.parse().ok())
    }
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_echoes_everything_but_the_page() {
        let query = PollsQuery {
            num_votes: Some("".into()),
            search: Some("red car".into()),
            page: Some("3".into()),
            ..PollsQuery::default()
        };
        assert_eq!(query.params(), "num_votes=&search=red+car");
    }

    #[test]
    fn params_of_a_bare_request_is_empty() {
        assert_eq!(PollsQuery::default().params(), "");
    }

    #[test]
    fn page_numbers_that_do_not_parse_are_ignored() {
        let mut query = PollsQuery {
            page: Some("two".into()),
            ..PollsQuery::default()
        };
        assert_eq!(query.requested_page(), None);
        query.page = Some("2".into());
        assert_eq!(query.requested_page(), Some(2));
    }
}
