//! HTTP middleware: the request gate and request ID tracking.

pub mod gate;
pub mod request_id;
