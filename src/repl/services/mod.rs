//! # Services Layer
//!
//! Abstracts external resources. The only one is the remote
//! format/benchmark service.

pub mod http;

pub use http::{HttpTransport, ServiceResponse, SubmitRequest, Transport, TransportError};
