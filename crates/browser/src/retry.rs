use std::time::Duration;

use tracing::{info, warn};

use crate::actions::ActionExecutor;
use crate::locator::{locate, ElementName};
use crate::session::BrowserSession;

/// Per-operation states. `Succeeded` and `Failed` are terminal and reach
/// callers as a boolean, never as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting,
    Recovering,
    Succeeded,
    Failed,
}

/// What the driver should do after an attempt outcome is recorded.
#[derive(Debug, PartialEq, Eq)]
pub enum NextStep {
    Finished(bool),
    Recover,
}

/// Bookkeeping for one logical operation (a single click or fill call).
/// Created per operation and discarded after success or exhaustion.
#[derive(Debug)]
pub struct RetryContext {
    element: &'static str,
    attempts_remaining: u32,
    total_attempts: u32,
    state: RetryState,
}

impl RetryContext {
    pub fn new(element: &'static str, max_attempts: u32) -> Self {
        let total = max_attempts.max(1);
        Self {
            element,
            attempts_remaining: total,
            total_attempts: total,
            state: RetryState::Attempting,
        }
    }

    pub fn element(&self) -> &'static str {
        self.element
    }

    pub fn attempt_number(&self) -> u32 {
        self.total_attempts - self.attempts_remaining + 1
    }

    pub fn total_attempts(&self) -> u32 {
        self.total_attempts
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Record an attempt outcome. Recovery is only scheduled while attempts
    /// remain; the final failure finishes without another reload.
    pub fn record(&mut self, success: bool) -> NextStep {
        if success {
            self.state = RetryState::Succeeded;
            return NextStep::Finished(true);
        }

        self.attempts_remaining -= 1;
        if self.attempts_remaining == 0 {
            self.state = RetryState::Failed;
            NextStep::Finished(false)
        } else {
            self.state = RetryState::Recovering;
            NextStep::Recover
        }
    }

    /// Back to `Attempting` once the page has been reloaded.
    pub fn resume(&mut self) {
        self.state = RetryState::Attempting;
    }
}

/// The action half of one logical operation.
#[derive(Debug, Clone, Copy)]
pub enum ElementAction<'t> {
    Click,
    Fill(&'t str),
}

pub struct RetryController<'a> {
    session: &'a BrowserSession,
    max_attempts: u32,
    recovery_pause: Duration,
    locate_budget: Duration,
}

impl<'a> RetryController<'a> {
    pub fn new(session: &'a BrowserSession, max_attempts: u32, recovery_pause: Duration) -> Self {
        let locate_budget = Duration::from_millis(session.config().selector_timeout_ms);
        Self {
            session,
            max_attempts,
            recovery_pause,
            locate_budget,
        }
    }

    /// Locate + act with bounded retries. Recovery is a full page reload:
    /// against a slow external site the usual culprit is a half-rendered
    /// page, and re-running the selectors on the same DOM would fail the
    /// same way.
    pub async fn with_retries(&self, name: ElementName, action: ElementAction<'_>) -> bool {
        let spec = name.spec();
        let mut ctx = RetryContext::new(name.label(), self.max_attempts);

        loop {
            info!(
                element = ctx.element(),
                attempt = ctx.attempt_number(),
                total = ctx.total_attempts(),
                "attempting"
            );

            let located = locate(self.session, &spec, self.locate_budget).await;
            let ok = match located.locator {
                Some(locator) => {
                    let executor = ActionExecutor::new(self.session);
                    match action {
                        ElementAction::Click => executor.perform_click(locator).await,
                        ElementAction::Fill(text) => executor.perform_fill(locator, text).await,
                    }
                }
                None => {
                    warn!(element = ctx.element(), "no selector candidate matched");
                    false
                }
            };

            match ctx.record(ok) {
                NextStep::Finished(result) => {
                    if result {
                        info!(
                            element = ctx.element(),
                            selector = located.selector_used().as_deref().unwrap_or("-"),
                            "operation succeeded"
                        );
                    } else {
                        warn!(
                            element = ctx.element(),
                            attempts = ctx.total_attempts(),
                            "operation failed, attempts exhausted"
                        );
                    }
                    return result;
                }
                NextStep::Recover => {
                    self.recover().await;
                    ctx.resume();
                }
            }
        }
    }

    async fn recover(&self) {
        info!("reloading page before retry");
        if let Err(e) = self.session.reload().await {
            warn!(error = %e, "reload failed");
        }
        tokio::time::sleep(self.recovery_pause).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_on_first_attempt_is_terminal() {
        let mut ctx = RetryContext::new("email_input", 3);
        assert_eq!(ctx.attempt_number(), 1);
        assert_eq!(ctx.record(true), NextStep::Finished(true));
        assert_eq!(ctx.state(), RetryState::Succeeded);
    }

    #[test]
    fn always_failing_action_recovers_exactly_twice() {
        let mut ctx = RetryContext::new("submit_button", 3);
        let mut recoveries = 0;

        loop {
            match ctx.record(false) {
                NextStep::Recover => {
                    recoveries += 1;
                    ctx.resume();
                    assert_eq!(ctx.state(), RetryState::Attempting);
                }
                NextStep::Finished(result) => {
                    assert!(!result);
                    break;
                }
            }
        }

        // No reload after the final failed attempt.
        assert_eq!(recoveries, 2);
        assert_eq!(ctx.state(), RetryState::Failed);
    }

    #[test]
    fn success_after_recovery_is_terminal() {
        let mut ctx = RetryContext::new("signup_link", 3);
        assert_eq!(ctx.record(false), NextStep::Recover);
        assert_eq!(ctx.state(), RetryState::Recovering);
        ctx.resume();
        assert_eq!(ctx.attempt_number(), 2);
        assert_eq!(ctx.record(true), NextStep::Finished(true));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let mut ctx = RetryContext::new("email_input", 0);
        assert_eq!(ctx.record(false), NextStep::Finished(false));
    }
}
