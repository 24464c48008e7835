//! Internal modules for the Ride the Bus terminal client.
//!
//! This library provides command parsing, the HTTP API client and the
//! reconnecting push-channel client used by the rtb_client binary.

pub mod api_client;
pub mod commands;
pub mod websocket_client;
