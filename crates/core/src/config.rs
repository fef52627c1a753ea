use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub target: TargetConfig,
    pub email: EmailConfig,
    pub register: RegisterConfig,
    pub browser: BrowserConfig,
    pub inbox: InboxConfig,
    pub files: FilesConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TargetConfig {
    pub home_url: String,
    pub signup_url: String,
    /// Issued credentials are recognized by this prefix when scraping the
    /// dashboard, e.g. "tvly-".
    pub key_prefix: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            home_url: "https://app.tavily.com/home".to_string(),
            signup_url: "https://app.tavily.com/home".to_string(),
            key_prefix: "tvly-".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmailConfig {
    pub check_url: String,
    pub domain: String,
    /// Used when no prefix can be derived from the saved auth cookie.
    pub default_prefix: String,
    /// Name of the webmail cookie holding the JWT with account claims.
    pub auth_cookie: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            check_url: "https://www.2925.com".to_string(),
            domain: "2925.com".to_string(),
            default_prefix: "user123".to_string(),
            auth_cookie: "aut".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RegisterConfig {
    pub default_password: String,
    pub max_attempts: u32,
    pub recovery_pause_secs: u64,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            default_password: "TavilyAuto123!".to_string(),
            max_attempts: 3,
            recovery_pause_secs: 2,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub nav_timeout_secs: u64,
    /// Total locate budget per logical element, split across candidates.
    pub selector_timeout_ms: u64,
    /// Bound for each visible/stable/editable wait before an action.
    pub precondition_timeout_ms: u64,
    /// Fixed pause after a click or fill before verification.
    pub settle_delay_ms: u64,
    /// Bound for the page-quiescence wait after navigation or a click.
    pub idle_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            nav_timeout_secs: 30,
            selector_timeout_ms: 10_000,
            precondition_timeout_ms: 5_000,
            settle_delay_ms: 1_000,
            idle_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InboxConfig {
    pub poll_interval_secs: u64,
    pub max_checks: u32,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            max_checks: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilesConfig {
    pub credentials_file: String,
    pub cookies_file: String,
    pub cookie_max_age_days: u64,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            credentials_file: "api_keys.md".to_string(),
            cookies_file: "email_cookies.json".to_string(),
            cookie_max_age_days: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_without_any_config() {
        let config = AppConfig::default();
        assert!(config.target.home_url.starts_with("https://"));
        assert_eq!(config.register.max_attempts, 3);
        assert_eq!(config.files.cookie_max_age_days, 7);
        assert_eq!(config.browser.selector_timeout_ms, 10_000);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [email]
            domain = "example-mail.test"
            "#,
        )
        .unwrap();
        assert_eq!(config.email.domain, "example-mail.test");
        assert_eq!(config.email.auth_cookie, "aut");
        assert_eq!(config.inbox.max_checks, 10);
    }
}
