//! newsrelay core library: chat command dispatch to the backend API, and the HTTP relay
//! from the backend back into the chat group. Used by the CLI.

pub mod backend;
pub mod bridge;
pub mod channels;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod init;
pub mod relay;
