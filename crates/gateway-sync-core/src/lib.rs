//! Core types for gateway-sync.
//!
//! This crate provides the locally declared side of route reconciliation:
//!
//! - **Routes**: name, HTTP method, path and auth requirement of an API route
//! - **Registry**: an explicitly constructed, append-only collection of routes
//! - **Controllers**: a builder that groups routes under a common path prefix
//!
//! # Example
//!
//! ```
//! use gateway_sync_core::{Controller, HttpMethod, Route, RouteRegistry};
//!
//! let mut registry = RouteRegistry::new();
//! registry.register(Route::new("health", HttpMethod::Get, "health", false));
//!
//! let users = Controller::new("users")
//!     .route("getUser", HttpMethod::Get, "/:id")
//!     .public_route("listUsers", HttpMethod::Get, "/");
//! registry.register_controller(users);
//!
//! assert_eq!(registry.len(), 3);
//! assert_eq!(registry.all()[1].path, "/users/.+");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod registry;
pub mod route;

pub use error::{CoreError, Result};
pub use registry::{Controller, RouteRegistry};
pub use route::{normalize_path, HttpMethod, Route};
