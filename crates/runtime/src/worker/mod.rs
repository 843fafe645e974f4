// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Troupe

//! Worker threads hosting actor instances.
//!
//! A worker owns one OS thread, one event loop, and one actor instance per
//! hosted message type. Actors are registered before the worker is handed to
//! the engine; `Engine::spawn` consumes the worker, so late registration is
//! unrepresentable. Within a worker all envelope dispatch is serialised: no
//! two handlers on the same worker ever run concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::Select;
use tracing::debug;

use crate::actor::context::WorkerContext;
use crate::actor::mailbox::{MessagePort, Port, create_mailbox};
use crate::actor::runner::{ActorInstance, RunnerSlot};
use crate::actor::traits::{Handler, MAILBOX_CAPACITY_MIN};
use crate::engine::registry::{TypeKey, type_key};
use crate::error::{Error, Result};

/// Interval for checking cancellation while blocked waiting for envelopes.
const SHUTDOWN_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// A set of actor instances that will share one OS thread.
pub struct Worker {
	slots: Vec<Box<dyn RunnerSlot>>,
	ports: HashMap<TypeKey, Box<dyn MessagePort>>,
}

impl Worker {
	pub fn new() -> Self {
		Self {
			slots: Vec::new(),
			ports: HashMap::new(),
		}
	}

	/// Registers an actor for the handler's message type.
	///
	/// At most one actor per message type per worker; a duplicate is
	/// rejected. The mailbox is sized from the handler's
	/// [`config`](Handler::config).
	pub fn register_actor<H: Handler>(&mut self, handler: H) -> Result<()> {
		let key = type_key::<H::Message>();
		if self.ports.contains_key(key) {
			return Err(Error::DuplicateActorType { type_key: key });
		}

		let config = handler.config();
		debug_assert!(
			config.mailbox_capacity >= MAILBOX_CAPACITY_MIN,
			"mailbox capacity below minimum"
		);

		let (tx, rx) = create_mailbox(config.mailbox_capacity);
		self.slots.push(Box::new(ActorInstance::new(handler, rx)));
		self.ports.insert(key, Box::new(Port::new(tx)));
		Ok(())
	}

	/// Number of actor types hosted by this worker.
	pub fn actor_count(&self) -> usize {
		self.slots.len()
	}

	/// Splits the worker into the runner that moves onto its thread and the
	/// enqueue ports the engine keeps.
	///
	/// `finished` is raised by the runner as its very last act, after the
	/// final discard sweep; parked callers use it to tell "reply still
	/// coming" from "nobody left to reply".
	pub(crate) fn bind(
		self,
		ctx: WorkerContext,
		finished: Arc<AtomicBool>,
	) -> (WorkerRunner, HashMap<TypeKey, Box<dyn MessagePort>>) {
		(
			WorkerRunner {
				slots: self.slots,
				ctx,
				finished,
			},
			self.ports,
		)
	}
}

impl Default for Worker {
	fn default() -> Self {
		Self::new()
	}
}

/// The spawned half of a worker: owns the actor instances and runs the event
/// loop on its dedicated thread.
pub(crate) struct WorkerRunner {
	slots: Vec<Box<dyn RunnerSlot>>,
	ctx: WorkerContext,
	finished: Arc<AtomicBool>,
}

impl WorkerRunner {
	/// Blocks the worker thread in the event loop until cancellation.
	///
	/// Waits on every hosted actor's mailbox at once; a ready mailbox gets
	/// drained completely before the loop rearms. The wait uses a short
	/// timeout so cancellation is observed even when no envelopes arrive.
	pub(crate) fn run(mut self) {
		debug!(worker = self.ctx.worker_id(), actors = self.slots.len(), "worker starting");

		loop {
			if self.ctx.is_cancelled() {
				break;
			}

			let ready = {
				let mut select = Select::new();
				for slot in &self.slots {
					slot.register(&mut select);
				}
				select.ready_timeout(SHUTDOWN_CHECK_INTERVAL)
			};

			if let Ok(index) = ready {
				self.slots[index].drain(&self.ctx);
			}
		}

		// Remaining envelopes are dropped; parked callers get the null
		// sentinel so nobody stays blocked past shutdown.
		for slot in &mut self.slots {
			slot.discard_pending();
		}
		self.finished.store(true, Ordering::Release);

		debug!(worker = self.ctx.worker_id(), "worker stopped");
	}
}
