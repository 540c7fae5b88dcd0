//! Jessica Mock Tool
//!
//! A configuration-driven HTTP mock server: requests matching a declared
//! stub are answered from static assets, everything else falls back to the
//! about endpoint or a 404.
//!
//! # Features
//!
//! - **Request Matching**: exact path + method, optionally constrained by
//!   deep equality between the request body and a referenced JSON file
//! - **Response Overrides**: status code, content type, and asset path
//!   rewriting per stub
//! - **Fallbacks**: about endpoint at `GET /jessica`, plain 404 otherwise
//! - **CORS pass-through**: allowed origins/methods/headers sourced from
//!   the configuration, with OPTIONS preflight short-circuiting
//!
//! The configuration artifact is reloaded on every request, so stubs can be
//! edited while the server runs.
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "version": "3",
//!   "port": "5000",
//!   "allowed_origins": "*",
//!   "allowed_methods": "GET, POST, OPTIONS",
//!   "allowed_headers": "Content-Type",
//!   "stubs": [
//!     {
//!       "request": { "url": "/users", "method": "GET" },
//!       "response": { "status": 200, "content": "users.json", "content-type": "application/json" }
//!     },
//!     {
//!       "request": { "url": "/users", "method": "POST", "body": "create_user.json" },
//!       "response": { "status": 201, "content": "created.json" }
//!     }
//!   ]
//! }
//! ```

pub mod config;
pub mod handler;
pub mod matcher;
pub mod server;
pub mod static_files;

pub use config::Config;
pub use handler::Dispatcher;
pub use server::MockServer;
