//! HTTP handlers, one module per resource

pub mod catalog;
pub mod contractors;
pub mod work_orders;
