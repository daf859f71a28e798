//! Wire protocol module.
//!
//! Defines request/response types and message framing for socket communication.
//!
//! ## Wire Format
//!
//! Messages are length-prefixed JSON:
//! ```text
//! [4 bytes: length (big-endian u32)][JSON payload]
//! ```

mod request;
mod response;
mod wire;

pub use request::GateRequest;
pub use response::{ErrorResponse, Response};
pub use wire::{read_frame, read_json, write_frame, write_json, DEFAULT_MAX_MESSAGE_SIZE};
