pub mod actions;
pub mod locator;
pub mod retry;
pub mod session;

pub use actions::ActionExecutor;
pub use locator::{locate, ElementName, LocateResult, Locator, SelectorSpec};
pub use retry::{ElementAction, RetryController, RetryContext};
pub use session::BrowserSession;
