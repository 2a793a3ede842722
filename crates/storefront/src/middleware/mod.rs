//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (added in `main`, capture errors and transactions)
//! 2. CORS (browser client origin from config)
//! 3. `Cache-Control: no-store` on every response
//! 4. `TraceLayer` (request span with status and latency)
//! 5. Request ID (recorded into the request span)

pub mod request_id;

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
