//! Audit logging module.
//!
//! Every audited command, and every authentication decision it makes, is
//! written as one JSON line with tokens, signatures and secrets redacted.

mod entry;
mod logger;
mod sanitize;

pub use entry::{AuditEntry, AuditResult};
pub use logger::AuditLogger;
pub use sanitize::sanitize_params;
