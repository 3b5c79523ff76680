//! Avahi service descriptor handling.
//!
//! The descriptor file advertises the daemon's port and current control
//! values as `<txt-record>` entries inside an Avahi service-group document.
//! `plan` holds the pure line-editing logic; `store` owns the file itself.

mod plan;
mod store;

pub use store::DescriptorStore;
