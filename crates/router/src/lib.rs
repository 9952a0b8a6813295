//! Minimal request router built from addins.
//!
//! Stands in for a host network-server framework: handlers are registered by
//! name in a [`HandlerTable`], `Route` addins link a verb and path to one of
//! those names, and `SubRouter` addins compose a nested path into a router
//! mounted under a prefix. [`install`] registers both builders on an engine.
//!
//! Dispatch is in-memory; there is no socket or HTTP parsing here.

mod builders;
mod error;
mod handler;
mod router;

pub use builders::{ROUTE, RouteBuilder, SUB_ROUTER, SubRouterBuilder, install};
pub use error::RouterError;
pub use handler::{Flow, Handler, HandlerTable, Request, Response};
pub use router::{Artifact, Mount, Route, Router, Verb};
