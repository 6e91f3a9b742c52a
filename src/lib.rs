//! Filters the workflow models offered for a page down to the ones whose
//! `appliesTo` patterns match the page path.

pub mod applicability;
pub mod config;
pub mod error;
pub mod filter;
pub mod host;
pub mod logging;
pub mod page_info;
pub mod protocol;
pub mod repository;
pub mod request_id;

pub use applicability::{ApplicabilityResolver, ApplicabilityRule};
pub use error::FilterError;
pub use filter::{FilterOutcome, FilterStats, filter_page_info, filter_page_info_json, filter_type_entry};
pub use page_info::{ModelEntry, PageInfo, TypeEntry, WorkflowsByType};
pub use repository::{ContentRepository, RepositoryResolver};
