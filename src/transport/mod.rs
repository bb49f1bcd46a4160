//! Inbound surfaces for the mutation handler.
//!
//! - `http`: axum router for direct HTTP clients
//! - `proxy`: gateway proxy events (`{"body": "..."}` in, proxy response out)

pub mod http;
pub mod proxy;

pub use self::http::{router, serve};
pub use self::proxy::{handle_proxy_event, ProxyEvent};
