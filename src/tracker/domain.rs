use url::Url;

/// Extracts the bare hostname from an absolute url. Only http and https pages
/// are trackable, so browser-internal pages, file urls and malformed input all
/// come back as `None` and no session may be started for them.
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.host_str().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::extract_domain;

    #[test]
    fn extracts_host_from_http_and_https() {
        assert_eq!(extract_domain("https://a.b.com/x"), Some("a.b.com".into()));
        assert_eq!(
            extract_domain("http://example.com/path?q=1"),
            Some("example.com".into())
        );
    }

    #[test]
    fn host_is_lowercased() {
        assert_eq!(
            extract_domain("HTTPS://EXAMPLE.COM/About"),
            Some("example.com".into())
        );
    }

    #[test]
    fn port_is_not_part_of_the_domain() {
        assert_eq!(
            extract_domain("https://localhost:8080/app"),
            Some("localhost".into())
        );
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert_eq!(extract_domain("ftp://x.com"), None);
        assert_eq!(extract_domain("chrome://extensions"), None);
        assert_eq!(extract_domain("file:///home/user/notes.txt"), None);
        assert_eq!(extract_domain("about:blank"), None);
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(extract_domain("not a url"), None);
        assert_eq!(extract_domain(""), None);
    }
}
