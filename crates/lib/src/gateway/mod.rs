//! Gateway: HTTP server for webhook deliveries.
//!
//! Single port serves a health probe and the webhook endpoint. Each delivery is verified,
//! routed, and answered before the response is returned.

mod server;

pub use server::{build_router, run_gateway, GatewayState};
