//! Operator HTTP API for directory provisioning.
//!
//! The binary in `main.rs` wires the stores, the directory clients and the
//! provisioning handler into an [`state::AppState`] and serves
//! [`api::create_router`].

pub mod api;
pub mod metrics;
pub mod state;
