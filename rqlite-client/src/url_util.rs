//! Small URL manipulation shared by the redirect-following paths in
//! [`crate::driver`] and [`crate::selector::leader`].

use url::Url;

/// Strips path, query and fragment off `url`, keeping only scheme, host and
/// port. Used both to turn a `Location` header into a bare node base URL and
/// to turn a redirect target into a follow target for the next attempt.
pub(crate) fn strip_to_origin(url: &Url) -> Option<Url> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let mut url = url.clone();
    url.set_path("");
    url.set_query(None);
    url.set_fragment(None);
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_path_and_query() {
        let stripped = strip_to_origin(&Url::parse("http://node2.example:4001/db/query?level=weak").unwrap()).unwrap();
        assert_eq!(stripped.as_str(), "http://node2.example:4001/");
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(strip_to_origin(&Url::parse("file:///etc/passwd").unwrap()).is_none());
    }
}
