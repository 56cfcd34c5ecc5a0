//! Query-string parameters understood by the browser entry point.

use url::form_urlencoded;

/// Parameters for joining or creating a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParams {
    /// Session to join; a new one is created when absent.
    pub session: Option<String>,
    /// Server host:port (e.g., "localhost:3000")
    pub server: Option<String>,
    /// Display name.
    pub user: Option<String>,
    /// Name for a newly created session.
    pub name: Option<String>,
}

impl UrlParams {
    /// Fill unset fields from `other`.
    pub fn or(self, other: UrlParams) -> UrlParams {
        UrlParams {
            session: self.session.or(other.session),
            server: self.server.or(other.server),
            user: self.user.or(other.user),
            name: self.name.or(other.name),
        }
    }
}

/// Parse parameters from a query string or hash, e.g.
/// `?session=abc123&server=localhost:3000`.
pub fn parse_params(s: &str) -> UrlParams {
    let s = s.trim_start_matches(['?', '#']);
    let mut params = UrlParams::default();

    for (key, value) in form_urlencoded::parse(s.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        let value = Some(value.into_owned());
        match &*key {
            "session" => params.session = value,
            "server" => params.server = value,
            "user" => params.user = value,
            "name" => params.name = value,
            _ => {}
        }
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let params = parse_params("?session=abc123&server=localhost:3000&user=ann");
        assert_eq!(params.session.as_deref(), Some("abc123"));
        assert_eq!(params.server.as_deref(), Some("localhost:3000"));
        assert_eq!(params.user.as_deref(), Some("ann"));
        assert_eq!(params.name, None);
    }

    #[test]
    fn test_parse_hash_and_empty_values() {
        let params = parse_params("#session=&name=team+board&junk");
        assert_eq!(params.session, None);
        assert_eq!(params.name.as_deref(), Some("team board"));
    }

    #[test]
    fn test_values_are_decoded() {
        let params = parse_params("?user=a%20b%2Fc&name=100%25");
        assert_eq!(params.user.as_deref(), Some("a b/c"));
        assert_eq!(params.name.as_deref(), Some("100%"));
    }

    #[test]
    fn test_query_takes_precedence_over_hash() {
        let query = parse_params("?session=q");
        let hash = parse_params("#session=h&user=bo");
        let merged = query.or(hash);
        assert_eq!(merged.session.as_deref(), Some("q"));
        assert_eq!(merged.user.as_deref(), Some("bo"));
    }
}
