//! Subdivision demo host.
//!
//! Loads addin manifests from a directory, starts the engine once discovery
//! finishes, builds one path into a router and dispatches the requests given
//! on the command line against it.

mod cli;
mod handlers;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use subdivision_manifest::ManifestLoader;
use subdivision_registry::{BoxError, Engine};
use subdivision_router::{Artifact, Request, Response, Router, install};

use crate::cli::Args;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	setup_tracing(args.verbose);

	let router = compose(&args).await?;
	for line in router.routes() {
		println!("{line}");
	}
	for (request, response) in dispatch(&router, &args.requests) {
		println!("{request} => {} {}", response.status, response.body);
	}
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("subdivision=debug,info")
		} else {
			EnvFilter::new("info")
		}
	});

	tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(true))
		.init();
}

/// Discovers manifests, starts the engine and builds `args.path` into a router.
async fn compose(args: &Args) -> anyhow::Result<Router> {
	let engine: Engine<Artifact> = Engine::new();
	engine.register_modules().context("failed to register built-in addins")?;

	let loader = ManifestLoader::new(&args.root).with_patterns(&args.patterns);
	tracing::info!(root = %loader.root().display(), patterns = ?loader.patterns(), "loading manifests");
	engine
		.start_after(async move {
			let report = tokio::task::spawn_blocking(move || loader.load()).await.map_err(BoxError::from)?;
			tracing::info!(files = report.sources.len(), failed = report.errors.len(), "manifests loaded");
			report.into_declarations().map_err(BoxError::from)
		})
		.await
		.context("failed to start addin engine")?;

	let handlers = handlers::demo_handlers().context("failed to register handlers")?;
	install(&engine, Arc::new(handlers)).context("failed to install router builders")?;

	let artifacts = engine
		.build(&args.path)
		.with_context(|| format!("failed to build `{}`", args.path))?;
	Ok(Router::from_artifacts(artifacts))
}

fn dispatch<'a>(router: &Router, requests: &'a [Request]) -> Vec<(&'a Request, Response)> {
	requests.iter().map(|request| (request, router.dispatch(request))).collect()
}
