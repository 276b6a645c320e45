//! Replybot core library: LINE webhook routing, reply strategies, and per-user
//! conversation context, used by the `replybot` CLI.

pub mod channels;
pub mod classify;
pub mod config;
pub mod error;
pub mod gateway;
pub mod init;
pub mod outbound;
pub mod reply;
pub mod router;
pub mod session;
