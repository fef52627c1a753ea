use rand::Rng;

const SUFFIX_LEN: usize = 8;

/// Random lowercase+digit suffix so each iteration registers with a fresh
/// address under the same inbox prefix.
pub fn generate_suffix() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// `prefix-suffix@domain`. The webmail delivers any suffixed variant to the
/// base prefix's inbox.
pub fn generate_email(prefix: &str, domain: &str) -> String {
    format!("{}-{}@{}", prefix, generate_suffix(), domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_has_expected_shape() {
        let email = generate_email("user123", "2925.com");
        assert!(email.starts_with("user123-"));
        assert!(email.ends_with("@2925.com"));

        let suffix = &email["user123-".len()..email.len() - "@2925.com".len()];
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn consecutive_emails_differ() {
        let a = generate_email("p", "d.test");
        let b = generate_email("p", "d.test");
        assert_ne!(a, b);
    }
}
