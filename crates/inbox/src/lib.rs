pub mod checker;
pub mod link_extractor;
pub mod prefix;

pub use checker::InboxChecker;
pub use link_extractor::extract_verification_link;
pub use prefix::email_prefix_from_cookies;
