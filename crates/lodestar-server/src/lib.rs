//! # Lodestar Server
//!
//! A small hyper HTTP/1 server: a method + path [`Router`], the
//! [`Handler`] trait, request and response types, and the JSON views of
//! the permission, blog and custom page subsystems.
//!
//! The acting user comes from the `X-User-Id` header, which the fronting
//! authentication layer is trusted to set.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lodestar_conf::Settings;
//! use lodestar_db::DatabaseConnection;
//! use lodestar_server::{AppState, HttpServer, build_router, shutdown_signal};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::default();
//! let db = DatabaseConnection::connect(&settings.database.url, 5).await?;
//! let state = Arc::new(AppState::new(db, &settings, None));
//! let server = HttpServer::new(Arc::new(build_router(state)));
//! server.listen("127.0.0.1:8080".parse()?, shutdown_signal()).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod error;
pub mod handler;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod views;

pub use app::{AppState, build_router};
pub use error::{ServerError, ServerResult};
pub use handler::{FnHandler, Handler, handler_fn, with_state};
pub use request::{Request, USER_HEADER};
pub use response::Response;
pub use router::Router;
pub use server::{DEFAULT_MAX_BODY_SIZE, HttpServer, shutdown_signal};
