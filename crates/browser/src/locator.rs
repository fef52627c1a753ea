use std::time::{Duration, Instant};

use tracing::debug;

use crate::session::BrowserSession;

const PRESENCE_POLL: Duration = Duration::from_millis(100);

/// Escape into a double-quoted JS string literal.
pub fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// A typed element locator. The registry orders these by how resilient they
/// tend to be against markup churn on a site we do not control: id/name
/// attributes first, text and class matches later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// `#id`
    Id(&'static str),
    /// `tag[attr="value"]`
    Attr {
        tag: &'static str,
        attr: &'static str,
        value: &'static str,
    },
    /// `tag[attr*="value"]`
    AttrContains {
        tag: &'static str,
        attr: &'static str,
        value: &'static str,
    },
    /// First `tag` whose text content contains `text`.
    Text {
        tag: &'static str,
        text: &'static str,
    },
    /// Raw CSS, for anything the other variants cannot express.
    Css(&'static str),
}

impl Locator {
    /// JS expression resolving to the element or `null`.
    pub fn js_finder(&self) -> String {
        match self {
            Locator::Id(id) => format!("document.getElementById({})", js_string(id)),
            Locator::Attr { tag, attr, value } => format!(
                "document.querySelector({})",
                js_string(&format!("{tag}[{attr}=\"{value}\"]"))
            ),
            Locator::AttrContains { tag, attr, value } => format!(
                "document.querySelector({})",
                js_string(&format!("{tag}[{attr}*=\"{value}\"]"))
            ),
            Locator::Text { tag, text } => format!(
                "(Array.from(document.querySelectorAll({})).find(el => (el.textContent || '').trim().includes({})) || null)",
                js_string(tag),
                js_string(text)
            ),
            Locator::Css(css) => format!("document.querySelector({})", js_string(css)),
        }
    }

    /// JS expression resolving to `true` when the element is in the document.
    pub fn js_exists(&self) -> String {
        format!("({}) !== null", self.js_finder())
    }

    /// Human-readable form for logs.
    pub fn describe(&self) -> String {
        match self {
            Locator::Id(id) => format!("#{id}"),
            Locator::Attr { tag, attr, value } => format!("{tag}[{attr}=\"{value}\"]"),
            Locator::AttrContains { tag, attr, value } => format!("{tag}[{attr}*=\"{value}\"]"),
            Locator::Text { tag, text } => format!("{tag}:text(\"{text}\")"),
            Locator::Css(css) => (*css).to_string(),
        }
    }
}

/// Logical elements of the sign-up and login flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementName {
    SignupLink,
    EmailInput,
    ContinueButton,
    PasswordInput,
    SubmitButton,
}

/// Ordered primary and fallback candidates for one logical element.
/// Immutable and defined at compile time.
#[derive(Debug, Clone, Copy)]
pub struct SelectorSpec {
    pub name: ElementName,
    pub primary: &'static [Locator],
    pub fallback: &'static [Locator],
}

impl ElementName {
    pub fn label(self) -> &'static str {
        match self {
            ElementName::SignupLink => "signup_link",
            ElementName::EmailInput => "email_input",
            ElementName::ContinueButton => "continue_button",
            ElementName::PasswordInput => "password_input",
            ElementName::SubmitButton => "submit_button",
        }
    }

    pub fn spec(self) -> SelectorSpec {
        match self {
            ElementName::SignupLink => SelectorSpec {
                name: self,
                primary: &[
                    Locator::Text {
                        tag: "a",
                        text: "Sign up",
                    },
                    Locator::AttrContains {
                        tag: "a",
                        attr: "href",
                        value: "signup",
                    },
                ],
                fallback: &[
                    Locator::Text {
                        tag: "a",
                        text: "Create account",
                    },
                    Locator::Css("a[class*='signup']"),
                ],
            },
            ElementName::EmailInput => SelectorSpec {
                name: self,
                primary: &[
                    Locator::Id("email"),
                    Locator::Attr {
                        tag: "input",
                        attr: "name",
                        value: "email",
                    },
                    Locator::Css("input[type='text'][autocomplete='email']"),
                ],
                fallback: &[
                    Locator::Css("form input[type='email']"),
                    Locator::Css("form input[type='text']"),
                ],
            },
            ElementName::ContinueButton => SelectorSpec {
                name: self,
                primary: &[
                    Locator::Css("button[name='action'][type='submit']"),
                    Locator::Text {
                        tag: "button",
                        text: "Continue",
                    },
                ],
                fallback: &[Locator::Css("button[type='submit']")],
            },
            ElementName::PasswordInput => SelectorSpec {
                name: self,
                primary: &[
                    Locator::Id("password"),
                    Locator::Attr {
                        tag: "input",
                        attr: "name",
                        value: "password",
                    },
                    Locator::Css("input[type='password'][autocomplete='new-password']"),
                ],
                fallback: &[Locator::Css("input[type='password']")],
            },
            ElementName::SubmitButton => SelectorSpec {
                name: self,
                primary: &[
                    Locator::Css("button[name='action'][type='submit']"),
                    Locator::Text {
                        tag: "button",
                        text: "Continue",
                    },
                ],
                fallback: &[
                    Locator::Css("button[type='submit']"),
                    Locator::Css("input[type='submit']"),
                ],
            },
        }
    }
}

impl SelectorSpec {
    /// Walk primary then fallback, returning the first candidate the probe
    /// accepts right now. Candidate order is never reordered or deduped:
    /// the primary list is exhausted before any fallback entry is tried.
    pub fn locate_now<F>(&self, mut present: F) -> Option<&'static Locator>
    where
        F: FnMut(&Locator) -> bool,
    {
        for list in [self.primary, self.fallback] {
            for locator in list {
                if present(locator) {
                    return Some(locator);
                }
            }
        }
        None
    }
}

/// Outcome of a locate pass. Not finding the element is a normal result
/// the retry layer interprets, never an error.
#[derive(Debug, Clone, Copy)]
pub struct LocateResult {
    pub locator: Option<&'static Locator>,
}

impl LocateResult {
    pub fn found(locator: &'static Locator) -> Self {
        Self {
            locator: Some(locator),
        }
    }

    pub fn not_found() -> Self {
        Self { locator: None }
    }

    pub fn is_found(&self) -> bool {
        self.locator.is_some()
    }

    pub fn selector_used(&self) -> Option<String> {
        self.locator.map(|locator| locator.describe())
    }
}

/// Try each candidate in order, giving every entry in a list an even share
/// of the budget. The split bounds total wait time no matter how long the
/// candidate list grows, trading per-candidate patience for responsiveness.
pub async fn locate(
    session: &BrowserSession,
    spec: &SelectorSpec,
    budget: Duration,
) -> LocateResult {
    for (phase, list) in [("primary", spec.primary), ("fallback", spec.fallback)] {
        if list.is_empty() {
            continue;
        }
        let share = budget / list.len() as u32;

        for locator in list {
            debug!(
                element = spec.name.label(),
                phase,
                selector = %locator.describe(),
                "trying selector"
            );
            if wait_for_present(session, locator, share).await {
                debug!(
                    element = spec.name.label(),
                    selector = %locator.describe(),
                    "element found"
                );
                return LocateResult::found(locator);
            }
            debug!(
                element = spec.name.label(),
                selector = %locator.describe(),
                "selector missed"
            );
        }
    }

    LocateResult::not_found()
}

async fn wait_for_present(session: &BrowserSession, locator: &Locator, share: Duration) -> bool {
    let deadline = Instant::now() + share;
    loop {
        if session.eval_bool(&locator.js_exists()) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(PRESENCE_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY: &[Locator] = &[Locator::Id("a"), Locator::Id("b")];
    const FALLBACK: &[Locator] = &[Locator::Id("c"), Locator::Id("d")];

    fn two_by_two_spec() -> SelectorSpec {
        SelectorSpec {
            name: ElementName::EmailInput,
            primary: PRIMARY,
            fallback: FALLBACK,
        }
    }

    #[test]
    fn first_primary_hit_stops_the_walk() {
        let spec = two_by_two_spec();
        let mut attempted = Vec::new();

        let found = spec.locate_now(|locator| {
            attempted.push(locator.describe());
            *locator == Locator::Id("a")
        });

        assert_eq!(found, Some(&Locator::Id("a")));
        assert_eq!(attempted, vec!["#a"]);
    }

    #[test]
    fn fallback_tried_only_after_primary_exhausted() {
        let spec = two_by_two_spec();
        let mut attempted = Vec::new();

        let found = spec.locate_now(|locator| {
            attempted.push(locator.describe());
            *locator == Locator::Id("c")
        });

        assert_eq!(found, Some(&Locator::Id("c")));
        assert_eq!(attempted, vec!["#a", "#b", "#c"]);
    }

    #[test]
    fn exhaustion_walks_every_candidate_in_order() {
        let spec = two_by_two_spec();
        let mut attempted = Vec::new();

        let found = spec.locate_now(|locator| {
            attempted.push(locator.describe());
            false
        });

        assert!(found.is_none());
        assert_eq!(attempted, vec!["#a", "#b", "#c", "#d"]);
    }

    #[test]
    fn js_string_escapes_quotes_and_backslashes() {
        assert_eq!(js_string(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(js_string("line\nbreak"), r#""line\nbreak""#);
    }

    #[test]
    fn text_locator_finder_embeds_escaped_needle() {
        let locator = Locator::Text {
            tag: "a",
            text: "Sign up",
        };
        let js = locator.js_finder();
        assert!(js.contains(r#""a""#));
        assert!(js.contains(r#""Sign up""#));
    }

    #[test]
    fn every_registered_element_has_primary_candidates() {
        for name in [
            ElementName::SignupLink,
            ElementName::EmailInput,
            ElementName::ContinueButton,
            ElementName::PasswordInput,
            ElementName::SubmitButton,
        ] {
            let spec = name.spec();
            assert!(!spec.primary.is_empty(), "{} has no primary", name.label());
        }
    }
}
