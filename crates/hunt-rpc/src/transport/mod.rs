//! RPC transports

pub mod http;
