//! Domain types of the dispatch engine

pub mod attempt;
pub mod catalog;
pub mod contractor;
pub mod notification;
pub mod rate;
pub mod status;
pub mod work_order;

pub use attempt::{AssignmentAttempt, AttemptStatus, AutomationStatus};
pub use catalog::{CatalogEntry, CatalogKind, CatalogPatch, CatalogStatus, NewCatalogEntry};
pub use contractor::{Contractor, ContractorAssignment, ContractorCandidate, StandardRate};
pub use notification::{DeliveryStatus, Notification, NotificationKind, NotificationRecord};
pub use rate::{Rate, compose};
pub use status::{Transition, WorkOrderStatus};
pub use work_order::{
    AssignmentType, LifecycleEntry, MapChildren, NewWorkOrder, WorkOrder, WorkOrderPatch,
};
