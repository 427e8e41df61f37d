//! Tool System - typed tool requests, catalog, and dispatch

mod catalog;
mod definition;
pub mod requests;
mod system_info;

pub use catalog::{ToolCatalog, dispatch, parse_arguments};
pub use definition::Tool;
pub use requests::{ToolRequest, required_id};
pub use system_info::{FEATURES, GET_SYSTEM_INFO, system_info};
