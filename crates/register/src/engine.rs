use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use keymill_browser::locator::js_string;
use keymill_browser::{BrowserSession, ElementAction, ElementName, RetryController};
use keymill_core::config::AppConfig;
use keymill_core::cookies::CookieRecord;
use keymill_core::credentials::{AccountRecord, CredentialStore};
use keymill_core::email::generate_email;
use keymill_inbox::InboxChecker;

/// Number of bounded re-checks while waiting for the dashboard to render
/// the issued key.
const KEY_CHECKS: u32 = 5;

/// Orchestrates one account provisioning run end to end: sign-up form,
/// inbox verification, login if prompted, key scrape, persistence.
pub struct SignupEngine {
    config: AppConfig,
    store: CredentialStore,
}

impl SignupEngine {
    pub fn new(config: AppConfig) -> Self {
        let store = CredentialStore::new(&config.files.credentials_file);
        Self { config, store }
    }

    /// One full iteration. `Ok(None)` is the expected-failure outcome (some
    /// stage gave up after its retries); `Err` is reserved for unexpected
    /// breakage and is isolated to this iteration by the caller. A record
    /// is appended only after every stage, including key extraction, has
    /// succeeded.
    pub async fn run_once(
        &self,
        cookies: &[CookieRecord],
        email_prefix: &str,
    ) -> Result<Option<AccountRecord>> {
        let email = generate_email(email_prefix, &self.config.email.domain);
        let password = self.config.register.default_password.clone();
        info!(email = %email, "starting sign-up iteration");

        if !self.register_account(&email, &password).await? {
            return Ok(None);
        }

        // The sign-up session is dropped before the inbox session starts,
        // so two browser processes never overlap.
        let Some(api_key) = self
            .collect_key_via_inbox(cookies, &email, &password)
            .await?
        else {
            return Ok(None);
        };

        let record = AccountRecord::new(email, Some(password), api_key);
        self.store.append(&record)?;

        info!(email = %record.email, "account provisioned");
        Ok(Some(record))
    }

    /// Drive the sign-up form: reach it, fill the address, continue, fill
    /// the password, submit. Each step runs under the retry controller and
    /// a `false` anywhere aborts the iteration.
    async fn register_account(&self, email: &str, password: &str) -> Result<bool> {
        let session = BrowserSession::launch(&self.config.browser)?;
        let retry = self.retry_controller(&session);

        session.navigate(&self.config.target.home_url).await?;

        if !retry
            .with_retries(ElementName::SignupLink, ElementAction::Click)
            .await
        {
            // The entry point is not always on the landing page; the
            // sign-up form has its own URL.
            info!("signup link not clickable, navigating to signup url directly");
            session.navigate(&self.config.target.signup_url).await?;
        }

        if !retry
            .with_retries(ElementName::EmailInput, ElementAction::Fill(email))
            .await
        {
            warn!("email field never accepted input, aborting iteration");
            return Ok(false);
        }
        if !retry
            .with_retries(ElementName::ContinueButton, ElementAction::Click)
            .await
        {
            warn!("continue button failed, aborting iteration");
            return Ok(false);
        }
        if !retry
            .with_retries(ElementName::PasswordInput, ElementAction::Fill(password))
            .await
        {
            warn!("password field never accepted input, aborting iteration");
            return Ok(false);
        }
        if !retry
            .with_retries(ElementName::SubmitButton, ElementAction::Click)
            .await
        {
            warn!("submit failed, aborting iteration");
            return Ok(false);
        }

        info!("sign-up form submitted");
        Ok(true)
    }

    /// Fresh browser for the webmail: find the verification message, follow
    /// its link, sign in if the target asks, scrape the issued key.
    async fn collect_key_via_inbox(
        &self,
        cookies: &[CookieRecord],
        email: &str,
        password: &str,
    ) -> Result<Option<String>> {
        let session = BrowserSession::launch(&self.config.browser)?;
        let checker = InboxChecker::new(
            &session,
            &self.config.email.check_url,
            self.config.inbox.clone(),
        );

        checker.open_inbox(cookies).await?;

        let Some(link) = checker.wait_for_verification_link(email).await else {
            return Ok(None);
        };

        session.navigate(&link).await?;

        if self.login_prompt_present(&session) {
            info!("verification landed on a login prompt, signing in");
            if !self.login(&session, email, password).await {
                warn!("login after verification failed");
                return Ok(None);
            }
        }

        Ok(self.scrape_api_key(&session).await)
    }

    /// The verification link sometimes lands on a login prompt instead of a
    /// signed-in dashboard.
    fn login_prompt_present(&self, session: &BrowserSession) -> bool {
        let probe = |spec: ElementName| {
            spec.spec()
                .locate_now(|locator| session.eval_bool(&locator.js_exists()))
                .is_some()
        };
        probe(ElementName::EmailInput) || probe(ElementName::PasswordInput)
    }

    async fn login(&self, session: &BrowserSession, email: &str, password: &str) -> bool {
        let retry = self.retry_controller(session);

        // Some layouts ask for the address and the password on separate
        // pages; only fill what is actually shown.
        let asks_for_email = ElementName::EmailInput
            .spec()
            .locate_now(|locator| session.eval_bool(&locator.js_exists()))
            .is_some();
        if asks_for_email {
            if !retry
                .with_retries(ElementName::EmailInput, ElementAction::Fill(email))
                .await
            {
                return false;
            }
            if !retry
                .with_retries(ElementName::ContinueButton, ElementAction::Click)
                .await
            {
                return false;
            }
        }

        if !retry
            .with_retries(ElementName::PasswordInput, ElementAction::Fill(password))
            .await
        {
            return false;
        }
        retry
            .with_retries(ElementName::SubmitButton, ElementAction::Click)
            .await
    }

    /// Sweep the page for the issued key: input values first, then leaf
    /// text nodes. Dashboards render the key asynchronously, so a few
    /// bounded re-checks.
    async fn scrape_api_key(&self, session: &BrowserSession) -> Option<String> {
        let sweep = format!(
            r#"(() => {{
                const prefix = {prefix};
                const token = (s) => {{
                    const i = s.indexOf(prefix);
                    if (i === -1) return null;
                    const m = s.slice(i).match(/^[A-Za-z0-9_-]+/);
                    return m ? m[0] : null;
                }};
                for (const el of document.querySelectorAll('input')) {{
                    const hit = token(el.value || '');
                    if (hit) return hit;
                }}
                for (const el of document.querySelectorAll('code, pre, span, td, p, div')) {{
                    if (el.childElementCount !== 0) continue;
                    const hit = token(el.textContent || '');
                    if (hit) return hit;
                }}
                return null;
            }})()"#,
            prefix = js_string(&self.config.target.key_prefix),
        );

        for check in 1..=KEY_CHECKS {
            if let Some(key) = session.eval_string(&sweep) {
                info!("api key located on page");
                return Some(key);
            }
            debug!(check, total = KEY_CHECKS, "key not on page yet");
            tokio::time::sleep(Duration::from_secs(2)).await;
            session.wait_until_idle().await;
        }

        warn!("no api key found on the dashboard");
        None
    }

    fn retry_controller<'s>(&self, session: &'s BrowserSession) -> RetryController<'s> {
        RetryController::new(
            session,
            self.config.register.max_attempts,
            Duration::from_secs(self.config.register.recovery_pause_secs),
        )
    }
}
