#[derive(Debug, thiserror::Error)]
pub enum RouterError {
	#[error("no handler named `{name}`")]
	UnknownHandler { name: String },
	#[error("duplicate handler name `{name}`")]
	DuplicateHandler { name: String },
	#[error("unknown verb `{verb}` (expected get, post, put, patch, delete or use)")]
	InvalidVerb { verb: String },
	#[error("malformed request line `{line}` (expected `METHOD /path`)")]
	InvalidRequest { line: String },
	#[error("invalid {kind} payload: {source}")]
	Payload {
		kind: &'static str,
		#[source]
		source: serde_json::Error,
	},
}
