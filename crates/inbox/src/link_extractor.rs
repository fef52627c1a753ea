use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Tokens that mark a link as the verification link rather than, say, an
/// unsubscribe footer or a "visit our site" banner.
const VERIFICATION_MARKERS: &[&str] = &["verify", "verification", "confirm"];

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"']+"#).expect("url pattern"));

/// Scan free-text email content for the verification link: the first URL
/// whose host or path carries a verification marker. Returns `None` when no
/// URL qualifies; an unrelated first URL is never used as a stand-in.
/// Fragments without a scheme ("app.example.com/verify") are deliberately
/// not matched: a partial URL is treated as absent, not guessed whole.
pub fn extract_verification_link(text: &str) -> Option<String> {
    for candidate in URL_RE.find_iter(text) {
        let raw = candidate
            .as_str()
            .trim_end_matches(&[')', ']', '.', ',', ';', '\'', '"'][..]);

        let Ok(url) = Url::parse(raw) else { continue };

        let host = url.host_str().unwrap_or("").to_ascii_lowercase();
        let path = url.path().to_ascii_lowercase();

        if VERIFICATION_MARKERS
            .iter()
            .any(|marker| host.contains(marker) || path.contains(marker))
        {
            return Some(raw.to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_url_wins_over_earlier_unmarked_urls() {
        let body = "Welcome! Visit https://site.com for docs.\n\
                    Activate here: https://site.com/verify?x=1\n\
                    Or opt out: https://site.com/unsubscribe";
        assert_eq!(
            extract_verification_link(body).as_deref(),
            Some("https://site.com/verify?x=1")
        );
    }

    #[test]
    fn no_marker_means_no_link_at_all() {
        let body = "Read https://site.com/welcome and https://blog.site.com/post";
        assert_eq!(extract_verification_link(body), None);
    }

    #[test]
    fn marker_in_host_counts() {
        let body = "Click https://verify.site.com/token/abc to continue";
        assert_eq!(
            extract_verification_link(body).as_deref(),
            Some("https://verify.site.com/token/abc")
        );
    }

    #[test]
    fn schemeless_fragments_are_not_guessed_into_urls() {
        let body = "Go to app.site.com/verify to finish";
        assert_eq!(extract_verification_link(body), None);
    }

    #[test]
    fn trailing_punctuation_is_trimmed() {
        let body = "Confirm your address (https://site.com/confirm/abc123).";
        assert_eq!(
            extract_verification_link(body).as_deref(),
            Some("https://site.com/confirm/abc123")
        );
    }

    #[test]
    fn empty_body_yields_none() {
        assert_eq!(extract_verification_link(""), None);
    }
}
