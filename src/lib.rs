// Signed Image Proxy Library
//
// Signs, verifies and serves on-demand image transformations. The HTTP layer
// lives in `proxy`; everything below it is framework independent.

pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod image;
pub mod logging;
pub mod metrics;
pub mod origin;
pub mod params;
pub mod pipeline;
pub mod proxy;
pub mod request_coalescing;
pub mod signing;
