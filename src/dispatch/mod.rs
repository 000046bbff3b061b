//! The dispatch engine: catalog, ids, matching, search, notifications and
//! the lifecycle state machine that ties them together

pub mod catalog;
pub mod ids;
pub mod lifecycle;
pub mod locks;
pub mod matcher;
pub mod notify;
pub mod search;

pub use catalog::CatalogService;
pub use ids::IdGenerator;
pub use lifecycle::{AssignmentOutcome, ContractorResponse, Decision, LifecycleEngine};
pub use locks::KeyedLocks;
pub use matcher::ContractorMatcher;
#[cfg(feature = "push")]
pub use notify::WebhookNotifier;
pub use notify::{LogNotifier, NotificationDispatcher};
pub use search::SearchIndex;
