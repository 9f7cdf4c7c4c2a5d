//! # hunt-core
//!
//! Core types for the hunt daemon RPC bridge.
//!
//! This crate provides the foundational types shared by the RPC layer and
//! the protocol bridge:
//! - Join parameters and their protocol enumerations
//! - RPC request/reply records
//! - Keepalive messages
//! - Error taxonomy and RPC error codes

pub mod error;
pub mod join;
pub mod keepalive;
pub mod rpc;

pub use error::{BridgeError, Result, error_codes};
pub use join::{ConnectMode, EnterStatus, JoinParameters, Team};
pub use keepalive::KeepaliveMessage;
pub use rpc::{
    GameDataReply, GameDataRequest, InputReply, InputRequest, JoinReply, JoinRequest,
    MessageReply, MessageRequest, PingReply, PingRequest, PlayerId, QuitReply, QuitRequest,
    StatsReply, StatsRequest, Token,
};
