use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::locator::{js_string, Locator};
use crate::session::BrowserSession;

/// Performs a single click or fill against a located element, enforcing
/// pre-conditions and verifying the outcome. Every failure mode collapses
/// to `false`; the retry layer decides what an attempt failure means.
pub struct ActionExecutor<'a> {
    session: &'a BrowserSession,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(session: &'a BrowserSession) -> Self {
        Self { session }
    }

    /// Click with visibility and layout-stability preconditions, a fixed
    /// settle delay, and a bounded page-idle wait afterwards.
    pub async fn perform_click(&self, locator: &Locator) -> bool {
        let bound = self.precondition_bound();

        if !self.wait_visible(locator, bound).await {
            debug!(selector = %locator.describe(), "element never became visible");
            return false;
        }
        if !self.wait_stable(locator, bound).await {
            debug!(selector = %locator.describe(), "element never stopped moving");
            return false;
        }

        let clicked = self.session.eval_bool(&format!(
            "(() => {{ const el = {}; if (!el) return false; el.click(); return true; }})()",
            locator.js_finder()
        ));
        if !clicked {
            warn!(selector = %locator.describe(), "click did not dispatch");
            return false;
        }

        self.settle().await;
        self.session.wait_until_idle().await;
        true
    }

    /// Fill with an editability precondition and a byte-for-byte readback
    /// gate: a site that silently rejects or truncates input fails here
    /// instead of three stages later.
    pub async fn perform_fill(&self, locator: &Locator, text: &str) -> bool {
        let bound = self.precondition_bound();

        if !self.wait_visible(locator, bound).await {
            debug!(selector = %locator.describe(), "element never became visible");
            return false;
        }
        if !self.wait_editable(locator, bound).await {
            debug!(selector = %locator.describe(), "element never became editable");
            return false;
        }

        let wrote = self.session.eval_bool(&format!(
            r#"(() => {{
                const el = {finder};
                if (!el) return false;
                el.focus();
                el.value = '';
                el.value = {value};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#,
            finder = locator.js_finder(),
            value = js_string(text),
        ));
        if !wrote {
            warn!(selector = %locator.describe(), "value write did not dispatch");
            return false;
        }

        self.settle().await;

        let readback = self.session.eval_string(&format!(
            "(() => {{ const el = {}; return el ? String(el.value) : null; }})()",
            locator.js_finder()
        ));
        if !fill_verified(text, readback.as_deref()) {
            warn!(
                selector = %locator.describe(),
                actual = readback.as_deref().unwrap_or("<none>"),
                "fill readback mismatch"
            );
            return false;
        }

        true
    }

    async fn wait_visible(&self, locator: &Locator, bound: Duration) -> bool {
        let probe = format!(
            "(() => {{ const el = {}; if (!el) return false; \
             const r = el.getBoundingClientRect(); const s = getComputedStyle(el); \
             return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }})()",
            locator.js_finder()
        );
        self.poll_until(&probe, bound).await
    }

    async fn wait_editable(&self, locator: &Locator, bound: Duration) -> bool {
        let probe = format!(
            "(() => {{ const el = {}; return !!el && !el.disabled && !el.readOnly; }})()",
            locator.js_finder()
        );
        self.poll_until(&probe, bound).await
    }

    /// Stable = identical bounding rect across two consecutive samples.
    async fn wait_stable(&self, locator: &Locator, bound: Duration) -> bool {
        let probe = format!(
            "(() => {{ const el = {}; if (!el) return null; \
             const r = el.getBoundingClientRect(); \
             return [r.x, r.y, r.width, r.height].join(','); }})()",
            locator.js_finder()
        );

        let deadline = Instant::now() + bound;
        let mut last: Option<String> = None;
        loop {
            let rect = self.session.eval_string(&probe);
            if rect.is_some() && rect == last {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            last = rect;
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
    }

    async fn poll_until(&self, probe: &str, bound: Duration) -> bool {
        let deadline = Instant::now() + bound;
        loop {
            if self.session.eval_bool(probe) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(self.session.config().settle_delay_ms)).await;
    }

    fn precondition_bound(&self) -> Duration {
        Duration::from_millis(self.session.config().precondition_timeout_ms)
    }
}

/// Success requires the field to hold exactly the intended text; absence of
/// an exception is not enough.
fn fill_verified(intended: &str, readback: Option<&str>) -> bool {
    readback == Some(intended)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readback_must_match_byte_for_byte() {
        assert!(fill_verified("user@example.test", Some("user@example.test")));
        assert!(!fill_verified("user@example.test", Some("user@example.tes")));
        assert!(!fill_verified("user@example.test", Some("USER@example.test")));
    }

    #[test]
    fn silently_rejected_write_reads_as_failure() {
        // The site accepted the events without throwing but kept the field
        // empty; the gate must still report failure.
        assert!(!fill_verified("text", Some("")));
        assert!(!fill_verified("text", None));
    }
}
