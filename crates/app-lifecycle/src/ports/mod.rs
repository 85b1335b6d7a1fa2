//! # Ports Layer
//!
//! - **Inbound (API)**: what the lifecycle service offers
//! - **Outbound (SPI)**: what it needs (network handle, credentials)

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
