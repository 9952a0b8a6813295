use std::path::PathBuf;

use clap::Parser;
use subdivision_router::Request;

/// Subdivision demo host command line arguments.
#[derive(Parser, Debug)]
#[command(name = "subdivision")]
#[command(about = "Compose addin manifests into a router and dispatch requests against it")]
pub struct Args {
	/// Directory searched for manifests
	#[arg(short, long, value_name = "DIR", default_value = "demos/modules")]
	pub root: PathBuf,

	/// Manifest glob relative to the root; repeatable. Defaults to manifest.{toml,json} anywhere below the root
	#[arg(short, long = "pattern", value_name = "GLOB")]
	pub patterns: Vec<String>,

	/// Addin path to build into the top-level router
	#[arg(long, value_name = "PATH", default_value = "Express/Routes")]
	pub path: String,

	/// Request to dispatch, e.g. "GET /admin/log"; repeatable
	#[arg(long = "request", value_name = "REQUEST")]
	pub requests: Vec<Request>,

	/// Verbose logging
	#[arg(short, long)]
	pub verbose: bool,
}
