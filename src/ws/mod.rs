//! WebSocket transport: upgrade, per-connection tasks, wire protocol

pub mod handler;
pub mod ingress;
pub mod protocol;
