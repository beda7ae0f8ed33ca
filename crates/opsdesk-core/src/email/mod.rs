//! Email projections and list filters.

mod filter;
mod model;
mod projection;

pub use filter::{DateRange, EmailFilters, apply_filters};
pub use model::{Attachment, Email, Folder};
pub use projection::{Header, RawAttachment, RawMessage};
