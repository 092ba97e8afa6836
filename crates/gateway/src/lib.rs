//! Gateway: the HTTP-triggered token refresh function and its server.
//!
//! Lifecycle of one invocation:
//! 1. OPTIONS requests get a CORS preflight reply and nothing else
//! 2. Read the latest token version from the secret store
//! 3. Exchange it at the Threads refresh endpoint
//! 4. Append the refreshed token as a new secret version
//! 5. Reply with a JSON status body

pub mod error;
pub mod handler;
pub mod response;
pub mod server;

pub use {
    error::RefreshError,
    handler::{RefreshOutcome, TokenRefreshHandler},
    response::{HandlerResponse, RefreshBody},
    server::{build_app, build_handler, start_server},
};
