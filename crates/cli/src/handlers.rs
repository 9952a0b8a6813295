//! Handlers and built-in addins of the demo host.

use subdivision_registry::{Addin, Declaration, addin_module};
use subdivision_router::{Flow, HandlerTable, ROUTE, RouterError};

/// Path the demo manifests extend.
pub const ROOT_PATH: &str = "Express/Routes";

addin_module!("subdivision-cli", || vec![Declaration::new(ROOT_PATH).with(
	Addin::new(ROUTE)
		.with_id("health")
		.with_order(1000)
		.with_field("verb", "get")
		.with_field("route", "/health")
		.with_field("handler", "host.health"),
)]);

/// The handler names referenced by the demo manifests.
pub fn demo_handlers() -> Result<HandlerTable, RouterError> {
	let mut handlers = HandlerTable::new();
	handlers.insert_text("host.health", "ok")?;
	handlers.insert_text("admin.log.get", "Got the log")?;
	handlers.insert_text("admin.log.post", "Posted something to the log")?;
	handlers.insert_text("users.info", "User info")?;
	handlers.insert("users.verify", |req, res| {
		tracing::info!(request = %req, "verified user");
		res.set_header("x-user-verified", "true");
		Flow::Next
	})?;
	handlers.insert("users.touch", |req, _| {
		tracing::info!(request = %req, "did something with user");
		Flow::Next
	})?;
	Ok(handlers)
}
