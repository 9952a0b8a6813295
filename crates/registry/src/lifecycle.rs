//! One-way `NotReady → Starting → Ready` gate.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{Error, Result};

const NOT_READY: u8 = 0;
const STARTING: u8 = 1;
const READY: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
	/// Declarations may be registered; nothing can be built yet.
	NotReady,
	/// `start_after` is waiting on discovery. Direct registration is closed.
	Starting,
	/// Declarations are frozen; builds are allowed.
	Ready,
}

#[derive(Debug, Default)]
pub struct Lifecycle {
	state: AtomicU8,
}

impl Lifecycle {
	pub const fn new() -> Self {
		Self {
			state: AtomicU8::new(NOT_READY),
		}
	}

	pub fn state(&self) -> LifecycleState {
		match self.state.load(Ordering::Acquire) {
			NOT_READY => LifecycleState::NotReady,
			STARTING => LifecycleState::Starting,
			_ => LifecycleState::Ready,
		}
	}

	pub fn is_ready(&self) -> bool {
		self.state() == LifecycleState::Ready
	}

	/// Fails unless declarations may still be registered.
	pub fn ensure_open(&self, operation: &'static str) -> Result<()> {
		match self.state() {
			LifecycleState::NotReady => Ok(()),
			_ => Err(Error::AlreadyStarted { operation }),
		}
	}

	/// Fails unless the engine has finished starting.
	pub fn ensure_ready(&self, operation: &'static str) -> Result<()> {
		match self.state() {
			LifecycleState::Ready => Ok(()),
			_ => Err(Error::NotReady { operation }),
		}
	}

	/// Claims the single start transition. A second caller gets `AlreadyStarted`.
	pub(crate) fn begin_start(&self) -> Result<()> {
		self.state
			.compare_exchange(NOT_READY, STARTING, Ordering::AcqRel, Ordering::Acquire)
			.map(|_| ())
			.map_err(|_| Error::AlreadyStarted { operation: "start" })
	}

	/// Returns a failed start to `NotReady`.
	pub(crate) fn abort_start(&self) {
		let _ = self
			.state
			.compare_exchange(STARTING, NOT_READY, Ordering::AcqRel, Ordering::Acquire);
	}

	pub(crate) fn finish_start(&self) {
		self.state.store(READY, Ordering::Release);
	}
}
