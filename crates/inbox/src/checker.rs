use std::time::Duration;

use tracing::{info, warn};

use keymill_browser::locator::js_string;
use keymill_browser::BrowserSession;
use keymill_core::config::InboxConfig;
use keymill_core::cookies::CookieRecord;
use keymill_core::error::AutomationError;

use crate::link_extractor::extract_verification_link;

/// Drives the webmail UI: loads the inbox with saved session cookies and
/// polls for the verification message addressed to a generated recipient.
pub struct InboxChecker<'a> {
    session: &'a BrowserSession,
    check_url: String,
    config: InboxConfig,
}

impl<'a> InboxChecker<'a> {
    pub fn new(
        session: &'a BrowserSession,
        check_url: impl Into<String>,
        config: InboxConfig,
    ) -> Self {
        Self {
            session,
            check_url: check_url.into(),
            config,
        }
    }

    /// Hit the webmail origin once so cookies have a document to attach to,
    /// inject them, then navigate again so the page loads authenticated.
    pub async fn open_inbox(&self, cookies: &[CookieRecord]) -> Result<(), AutomationError> {
        self.session.navigate(&self.check_url).await?;
        self.session.set_cookies(cookies)?;
        self.session.navigate(&self.check_url).await?;

        info!(url = %self.session.current_url(), "inbox loaded");
        Ok(())
    }

    /// Poll the inbox for a message addressed to `recipient`, returning its
    /// verification link. Bounded checks at a fixed spacing; running out of
    /// checks is a normal outcome, not an error.
    pub async fn wait_for_verification_link(&self, recipient: &str) -> Option<String> {
        for check in 1..=self.config.max_checks {
            info!(check, total = self.config.max_checks, "checking inbox");

            if check > 1 {
                // Back to the message list; the previous check may have
                // left the view inside an opened message.
                if let Err(e) = self.session.navigate(&self.check_url).await {
                    warn!(error = %e, "inbox reload failed");
                }
            }

            if self.open_message_for(recipient) {
                tokio::time::sleep(Duration::from_secs(2)).await;
                self.session.wait_until_idle().await;

                if let Some(body) = self.session.body_text() {
                    if let Some(link) = extract_verification_link(&body) {
                        info!(link = %link, "verification link found");
                        return Some(link);
                    }
                    warn!("message opened but no verification link in body");
                }
            }

            tokio::time::sleep(Duration::from_secs(self.config.poll_interval_secs)).await;
        }

        warn!(
            checks = self.config.max_checks,
            "no verification email arrived"
        );
        None
    }

    /// Find a message-list entry mentioning the recipient and open it. The
    /// list markup is not ours, so this scans leaf nodes instead of
    /// trusting any particular row structure.
    fn open_message_for(&self, recipient: &str) -> bool {
        self.session.eval_bool(&format!(
            r#"(() => {{
                const needle = {needle};
                const nodes = Array.from(document.querySelectorAll('a, li, tr, td, div, span'));
                const hit = nodes.find(el =>
                    el.childElementCount === 0 &&
                    (el.textContent || '').includes(needle));
                if (!hit) return false;
                (hit.closest('a') || hit.closest('li') || hit.closest('tr') || hit).click();
                return true;
            }})()"#,
            needle = js_string(recipient),
        ))
    }
}
