//! RPC layer for the HiveServer2 CLI service.
//!
//! - `codec` - binary protocol primitives
//! - `messages` - request and response structs
//! - `wire` - struct encodings and message framing
//! - `service` - the typed service interface
//! - `client` - the network implementation of that interface
//! - `status` - translation of status blocks into errors

pub mod client;
pub mod codec;
pub mod messages;
pub mod service;
pub mod status;
pub mod wire;

pub use client::ThriftClient;
pub use service::TcliService;
pub use status::check_status;
