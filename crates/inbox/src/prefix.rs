use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use tracing::{debug, info};

use keymill_core::cookies::CookieRecord;

/// Derive the inbox's email prefix from the webmail auth cookie, a JWT
/// whose claims carry the account address. Any decode failure means "no
/// prefix available" and the caller falls back to the configured default.
pub fn email_prefix_from_cookies(cookies: &[CookieRecord], auth_cookie: &str) -> Option<String> {
    let token = cookies
        .iter()
        .find(|cookie| cookie.name == auth_cookie)
        .map(|cookie| cookie.value.as_str())?;

    let claims = decode_jwt_claims(token)?;

    if let Some(name) = claims.get("name").and_then(|v| v.as_str()) {
        if let Some((prefix, _)) = name.split_once('@') {
            if !prefix.is_empty() {
                info!(prefix, "email prefix derived from auth cookie");
                return Some(prefix.to_string());
            }
        }
    }

    if let Some(nickname) = claims.get("nickname").and_then(|v| v.as_str()) {
        if !nickname.is_empty() {
            info!(prefix = nickname, "nickname used as email prefix");
            return Some(nickname.to_string());
        }
    }

    debug!("auth cookie decoded but carries no usable address");
    None
}

/// Lenient JWT payload decode: padding stripped, URL-safe alphabet first
/// with a standard-alphabet retry. No padding arithmetic.
fn decode_jwt_claims(token: &str) -> Option<serde_json::Value> {
    let payload = token.split('.').nth(1)?;
    let trimmed = payload.trim_end_matches('=');

    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .ok()?;

    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_cookie(claims: &serde_json::Value) -> CookieRecord {
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        CookieRecord {
            name: "aut".to_string(),
            value: format!("hdr.{payload}.sig"),
            domain: ".2925.com".to_string(),
            path: "/".to_string(),
            expires: -1.0,
            http_only: true,
            secure: true,
            same_site: "Lax".to_string(),
        }
    }

    #[test]
    fn prefix_comes_from_name_claim_local_part() {
        let cookie = auth_cookie(&serde_json::json!({"name": "user123@2925.com"}));
        assert_eq!(
            email_prefix_from_cookies(&[cookie], "aut").as_deref(),
            Some("user123")
        );
    }

    #[test]
    fn nickname_is_the_fallback_claim() {
        let cookie = auth_cookie(&serde_json::json!({"name": "", "nickname": "nick42"}));
        assert_eq!(
            email_prefix_from_cookies(&[cookie], "aut").as_deref(),
            Some("nick42")
        );
    }

    #[test]
    fn malformed_token_yields_none() {
        let mut cookie = auth_cookie(&serde_json::json!({"name": "user123@2925.com"}));
        cookie.value = "not-a-jwt".to_string();
        assert_eq!(email_prefix_from_cookies(&[cookie], "aut"), None);

        let mut garbled = auth_cookie(&serde_json::json!({"name": "a@b"}));
        garbled.value = "hdr.%%%%.sig".to_string();
        assert_eq!(email_prefix_from_cookies(&[garbled], "aut"), None);
    }

    #[test]
    fn missing_auth_cookie_yields_none() {
        let cookie = auth_cookie(&serde_json::json!({"name": "user123@2925.com"}));
        assert_eq!(email_prefix_from_cookies(&[cookie], "session"), None);
    }

    #[test]
    fn padded_payload_is_tolerated() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"name":"padme@2925.com"}"#);
        let cookie = CookieRecord {
            value: format!("hdr.{payload}==.sig"),
            ..auth_cookie(&serde_json::json!({}))
        };
        assert_eq!(
            email_prefix_from_cookies(&[cookie], "aut").as_deref(),
            Some("padme")
        );
    }
}
