// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Troupe

//! Worker context and the handler-facing actor scope.
//!
//! The context describes a worker to the actors it hosts:
//! - The worker id
//! - A back-reference to the engine (for re-entry from handlers)
//! - Cancellation status for graceful shutdown
//!
//! The scope is handed to a handler for the duration of one message and adds
//! the actor's private state slot on top of the context.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::actor::traits::Payload;
use crate::engine::registry::WorkerId;
use crate::engine::{Engine, EngineCore};
use crate::error::{Error, Result};

/// A cancellation token for signaling shutdown.
///
/// This is a simple atomic boolean that can be shared across workers.
#[derive(Clone)]
pub struct CancellationToken {
	cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
	/// Create a new cancellation token.
	pub fn new() -> Self {
		Self {
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Signal cancellation.
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	/// Check if cancellation was requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}

impl Default for CancellationToken {
	fn default() -> Self {
		Self::new()
	}
}

/// Describes a worker to the actors it hosts.
///
/// One context per worker, shared by all of the worker's actor instances.
pub struct WorkerContext {
	worker_id: WorkerId,
	engine: Weak<EngineCore>,
	cancel: CancellationToken,
}

impl WorkerContext {
	pub(crate) fn new(worker_id: WorkerId, engine: Weak<EngineCore>, cancel: CancellationToken) -> Self {
		Self {
			worker_id,
			engine,
			cancel,
		}
	}

	/// Context without an engine attached, for driving handlers outside a
	/// spawned worker.
	pub(crate) fn detached() -> Self {
		Self::new(0, Weak::new(), CancellationToken::new())
	}

	/// The hosting worker's dense id.
	pub fn worker_id(&self) -> WorkerId {
		self.worker_id
	}

	/// The engine this worker belongs to.
	///
	/// The back-reference is weak; it fails once the engine itself has been
	/// dropped.
	pub fn engine(&self) -> Result<Engine> {
		self.engine
			.upgrade()
			.map(Engine::from_core)
			.ok_or(Error::InvalidState("engine has shut down"))
	}

	/// Check if shutdown was requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}
}

/// Type-erased per-actor user state.
///
/// The actor owns the slot exclusively; it is only reachable from inside the
/// handler, and is dropped with the actor instance.
pub(crate) struct StateSlot {
	value: Option<Box<dyn Any + Send>>,
}

impl StateSlot {
	pub(crate) fn new() -> Self {
		Self { value: None }
	}

	pub(crate) fn get<S: Any + Send>(&mut self) -> Option<&mut S> {
		self.value.as_mut()?.downcast_mut::<S>()
	}

	pub(crate) fn set<S: Any + Send>(&mut self, state: S) {
		self.value = Some(Box::new(state));
	}

	pub(crate) fn reset(&mut self) {
		self.value = None;
	}
}

/// Handle passed to a handler for the duration of one message.
///
/// Grants access to the actor's state slot, the worker context, and re-entry
/// into the engine for follow-up sends and calls.
pub struct ActorScope<'a> {
	ctx: &'a WorkerContext,
	state: &'a mut StateSlot,
}

impl<'a> ActorScope<'a> {
	pub(crate) fn new(ctx: &'a WorkerContext, state: &'a mut StateSlot) -> Self {
		Self { ctx, state }
	}

	/// The hosting worker's dense id.
	pub fn worker_id(&self) -> WorkerId {
		self.ctx.worker_id()
	}

	/// The engine hosting this actor.
	pub fn engine(&self) -> Result<Engine> {
		self.ctx.engine()
	}

	/// Check if shutdown was requested.
	pub fn is_cancelled(&self) -> bool {
		self.ctx.is_cancelled()
	}

	/// The actor's state, if one of type `S` was installed.
	pub fn state<S: Any + Send>(&mut self) -> Option<&mut S> {
		self.state.get::<S>()
	}

	/// Installs the actor's state, replacing any previous value.
	pub fn set_state<S: Any + Send>(&mut self, state: S) {
		self.state.set(state);
	}

	/// Drops the actor's state.
	pub fn reset_state(&mut self) {
		self.state.reset();
	}

	/// Fire-and-forget send routed through the engine, load-balanced the
	/// same way as a top-level send.
	pub fn send<M: Send + 'static>(&self, msg: M) -> Result<()> {
		self.engine()?.send(msg)
	}

	/// Request/reply routed through the engine.
	///
	/// Fails fast with [`Error::SelfCall`] when the selected worker is the
	/// one running this handler: blocking here would deadlock the worker
	/// against itself.
	pub fn call<M: Send + 'static>(&self, msg: M) -> Result<Payload> {
		self.engine()?.call_from(msg, Some(self.ctx.worker_id()))
	}

	/// Broadcast routed through the engine.
	pub fn broadcast<M: Send + Clone + 'static>(&self, msg: M) -> Result<()> {
		self.engine()?.broadcast(msg)
	}
}
