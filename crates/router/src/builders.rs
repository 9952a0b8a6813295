//! Builders turning `Route` and `SubRouter` addins into router artifacts.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use subdivision_registry::{Addin, BuildContext, Builder, Engine, Error, Result};

use crate::error::RouterError;
use crate::handler::HandlerTable;
use crate::router::{Artifact, Mount, Route, Router, Verb};

/// Addin type of a single route or middleware.
pub const ROUTE: &str = "Route";
/// Addin type of a nested path mounted as a router.
pub const SUB_ROUTER: &str = "SubRouter";

fn root() -> String {
	"/".to_string()
}

#[derive(Debug, Deserialize)]
struct RouteFields {
	verb: Verb,
	#[serde(default = "root")]
	route: String,
	handler: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubRouterFields {
	routes_path: String,
	#[serde(default = "root")]
	mount: String,
}

fn read_fields<T: DeserializeOwned>(addin: &Addin, kind: &'static str) -> Result<T> {
	addin
		.payload_as()
		.map_err(|source| Error::builder(kind, RouterError::Payload { kind, source }))
}

/// Links `{verb, route, handler}` payloads against a [`HandlerTable`].
pub struct RouteBuilder {
	handlers: Arc<HandlerTable>,
}

impl RouteBuilder {
	pub fn new(handlers: Arc<HandlerTable>) -> Self {
		Self { handlers }
	}
}

impl Builder<Artifact> for RouteBuilder {
	fn build(&self, addin: &Addin, _cx: &BuildContext<'_, Artifact>) -> Result<Artifact> {
		let fields: RouteFields = read_fields(addin, ROUTE)?;
		let handler = self.handlers.get(&fields.handler).map_err(|err| Error::builder(ROUTE, err))?;
		tracing::trace!(verb = %fields.verb, route = %fields.route, handler = %fields.handler, "linked route");
		Ok(Artifact::Route(Route::new(fields.verb, &fields.route, &fields.handler, handler)))
	}
}

/// Builds `routesPath` recursively and mounts the result at `mount`.
#[derive(Debug, Default)]
pub struct SubRouterBuilder;

impl Builder<Artifact> for SubRouterBuilder {
	fn build(&self, addin: &Addin, cx: &BuildContext<'_, Artifact>) -> Result<Artifact> {
		let fields: SubRouterFields = read_fields(addin, SUB_ROUTER)?;
		let router = Router::from_artifacts(cx.build(&fields.routes_path)?);
		tracing::trace!(path = %fields.routes_path, mount = %fields.mount, layers = router.len(), "mounted sub-router");
		Ok(Artifact::Mount(Mount::new(&fields.mount, router)))
	}
}

/// Registers the [`ROUTE`] and [`SUB_ROUTER`] builders on `engine`.
pub fn install(engine: &Engine<Artifact>, handlers: Arc<HandlerTable>) -> Result<()> {
	engine.add_builder(ROUTE, RouteBuilder::new(handlers))?;
	engine.add_builder(SUB_ROUTER, SubRouterBuilder)
}
