// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Troupe

//! Engine: owner of all workers, the type registry, and typed routing.
//!
//! The engine maps a message's type-key to the ordered list of workers
//! hosting an actor for that type and routes three ways:
//!
//! - [`send`](Engine::send): fire-and-forget, round-robin across hosts
//! - [`call`](Engine::call): request/reply, round-robin, caller blocks on a
//!   one-shot reply channel
//! - [`broadcast`](Engine::broadcast): one envelope per host, registry order
//!
//! Round-robin is a single monotonic atomic counter taken modulo the host
//! count: deterministic for a sequential caller, acceptably distributed
//! under concurrent callers, and allocation-free on the engine side. It does
//! not consider mailbox occupancy; a slow handler accumulates a backlog.
//!
//! # Lifecycle
//!
//! ```text
//! Setup -spawn*-> Setup -start-> Running -stop-> Draining -joined-> Terminated
//! ```
//!
//! Workers spawn (and begin serving) during setup; `start` is a join
//! barrier that blocks until the workers exit; `stop` is the graceful,
//! idempotent shutdown.

pub mod registry;
pub mod timers;

use std::collections::HashMap;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread;

use tracing::debug;

use crate::actor::context::{CancellationToken, WorkerContext};
use crate::actor::mailbox::{MessagePort, PushError, ReplySlot};
use crate::actor::traits::Payload;
use crate::error::{Error, Result};
use crate::sync::oneshot::OneShot;
use crate::worker::Worker;
use self::registry::{Registry, TypeKey, WorkerId, type_key};

/// Upper bound on the number of workers one engine will spawn.
pub const WORKER_LIMIT: usize = 1024;

/// Spins between thread yields while a caller waits for its reply.
const RECEIVE_SPINS_PER_YIELD: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
	Setup,
	Running,
	Draining,
	Terminated,
}

/// Engine-side record of one spawned worker.
struct WorkerEntry {
	ports: HashMap<TypeKey, Box<dyn MessagePort>>,
	/// Set once a push observes the runner gone; selection probes past
	/// stopped workers.
	stopped: AtomicBool,
	/// Raised by the runner after its final discard sweep; from then on no
	/// reply will ever be posted by this worker.
	finished: Arc<AtomicBool>,
}

pub(crate) struct EngineCore {
	registry: RwLock<Registry>,
	workers: RwLock<Vec<WorkerEntry>>,
	/// Round-robin counter; monotonicity is all that is required of it.
	next: AtomicUsize,
	lifecycle: Mutex<Lifecycle>,
	lifecycle_changed: Condvar,
	join_handles: Mutex<Vec<thread::JoinHandle<()>>>,
	/// First joiner wins; everyone else waits for Terminated.
	joining: AtomicBool,
	cancel: CancellationToken,
}

impl Drop for EngineCore {
	fn drop(&mut self) {
		// Workers may still be running if the engine was dropped without
		// stop; leave them no reason to keep spinning.
		self.cancel.cancel();
	}
}

/// Process-level owner of workers and the message-type registry.
///
/// Cheap to clone; all clones share one core. Teardown is top-down: the
/// engine outlives its workers, and workers outlive their actors.
#[derive(Clone)]
pub struct Engine {
	core: Arc<EngineCore>,
}

impl Engine {
	pub fn new() -> Self {
		Self {
			core: Arc::new(EngineCore {
				registry: RwLock::new(Registry::default()),
				workers: RwLock::new(Vec::new()),
				next: AtomicUsize::new(0),
				lifecycle: Mutex::new(Lifecycle::Setup),
				lifecycle_changed: Condvar::new(),
				join_handles: Mutex::new(Vec::new()),
				joining: AtomicBool::new(false),
				cancel: CancellationToken::new(),
			}),
		}
	}

	pub(crate) fn from_core(core: Arc<EngineCore>) -> Self {
		Self { core }
	}

	/// Spawns a worker: assigns the next dense worker id, installs the
	/// worker context, records every hosted type in the registry, and starts
	/// the worker's OS thread.
	///
	/// Permitted only before [`start`](Engine::start).
	pub fn spawn(&self, worker: Worker) -> Result<WorkerId> {
		let lifecycle = self.core.lifecycle.lock().expect("lifecycle lock poisoned");
		if *lifecycle != Lifecycle::Setup {
			return Err(Error::InvalidState("spawn is only permitted before start"));
		}

		let mut workers = self.core.workers.write().expect("worker table lock poisoned");
		if workers.len() >= WORKER_LIMIT {
			return Err(Error::TooManyWorkers { limit: WORKER_LIMIT });
		}
		let worker_id = workers.len() as WorkerId;

		let ctx = WorkerContext::new(worker_id, Arc::downgrade(&self.core), self.core.cancel.clone());
		let finished = Arc::new(AtomicBool::new(false));
		let (runner, ports) = worker.bind(ctx, finished.clone());

		{
			let mut registry = self.core.registry.write().expect("registry lock poisoned");
			for &key in ports.keys() {
				registry.add_host(key, worker_id);
			}
		}

		workers.push(WorkerEntry {
			ports,
			stopped: AtomicBool::new(false),
			finished,
		});
		drop(workers);

		let handle = thread::Builder::new()
			.name(format!("troupe-worker-{worker_id}"))
			.spawn(move || runner.run())
			.expect("failed to spawn worker thread");
		self.core
			.join_handles
			.lock()
			.expect("join handle lock poisoned")
			.push(handle);

		debug!(worker = worker_id, "worker spawned");
		Ok(worker_id)
	}

	/// Number of spawned workers.
	pub fn worker_count(&self) -> usize {
		self.core.workers.read().expect("worker table lock poisoned").len()
	}

	/// Worker ids hosting an actor for `M`, in spawn order.
	pub fn hosts_of<M: Send + 'static>(&self) -> Vec<WorkerId> {
		self.core
			.registry
			.read()
			.expect("registry lock poisoned")
			.hosts(type_key::<M>())
			.map(<[WorkerId]>::to_vec)
			.unwrap_or_default()
	}

	/// Fire-and-forget delivery, load-balanced across the workers hosting
	/// `M`. The message is moved into the selected actor's mailbox.
	pub fn send<M: Send + 'static>(&self, msg: M) -> Result<()> {
		let key = type_key::<M>();
		let workers = self.core.workers.read().expect("worker table lock poisoned");
		let worker_id = self.select_host(key, &workers)?;
		let entry = &workers[worker_id as usize];

		match entry.port(key).push_one_way(Box::new(msg)) {
			Ok(()) => Ok(()),
			Err(err) => Err(self.push_failure(err, key, entry, worker_id)),
		}
	}

	/// Request/reply: enqueues a call envelope on one worker hosting `M` and
	/// blocks until the handler's reply arrives.
	///
	/// The null sentinel (handler produced no reply, or the envelope was
	/// discarded during shutdown) surfaces as [`Error::NoResponse`].
	pub fn call<M: Send + 'static>(&self, msg: M) -> Result<Payload> {
		self.call_from(msg, None)
	}

	pub(crate) fn call_from<M: Send + 'static>(&self, msg: M, from: Option<WorkerId>) -> Result<Payload> {
		let key = type_key::<M>();
		let reply: ReplySlot = Arc::new(OneShot::new());

		let finished = {
			let workers = self.core.workers.read().expect("worker table lock poisoned");
			let worker_id = self.select_host(key, &workers)?;
			if from == Some(worker_id) {
				return Err(Error::SelfCall {
					type_key: key,
					worker_id,
				});
			}
			let entry = &workers[worker_id as usize];

			if let Err(err) = entry.port(key).push_call(Box::new(msg), reply.clone()) {
				return Err(self.push_failure(err, key, entry, worker_id));
			}
			entry.finished.clone()
		};

		// Block outside the worker-table lock; the reply channel is the
		// only synchronisation with the handler. Once the runner has raised
		// `finished` no reply can arrive anymore, so posting the sentinel
		// ourselves settles the race between a late enqueue and the
		// runner's final discard sweep; whichever send won is what
		// `try_receive` observes.
		let mut spins: u32 = 0;
		loop {
			if let Some(value) = reply.try_receive() {
				return match value {
					Some(payload) => Ok(payload),
					None => Err(Error::NoResponse),
				};
			}
			if finished.load(Ordering::Acquire) {
				reply.send(None);
				continue;
			}
			spins = spins.wrapping_add(1);
			if spins % RECEIVE_SPINS_PER_YIELD == 0 {
				thread::yield_now();
			} else {
				std::hint::spin_loop();
			}
		}
	}

	/// One-way delivery to every worker hosting `M`, in registry order, each
	/// receiving an independent copy.
	///
	/// Stops at the first enqueue failure; the error names the worker.
	/// Hosts after the failing one are not attempted.
	pub fn broadcast<M: Send + Clone + 'static>(&self, msg: M) -> Result<()> {
		let key = type_key::<M>();
		let workers = self.core.workers.read().expect("worker table lock poisoned");
		let registry = self.core.registry.read().expect("registry lock poisoned");
		let hosts = registry.hosts(key).ok_or(Error::ActorNotFound { type_key: key })?;

		for &worker_id in hosts {
			let entry = &workers[worker_id as usize];
			if let Err(err) = entry.port(key).push_one_way(Box::new(msg.clone())) {
				return Err(self.push_failure(err, key, entry, worker_id));
			}
		}
		Ok(())
	}

	/// Round-robin selection over the hosts of `key`, probing past workers
	/// already marked stopped. Fails with [`Error::ActorNotFound`] when the
	/// type has no live host.
	fn select_host(&self, key: TypeKey, workers: &[WorkerEntry]) -> Result<WorkerId> {
		let registry = self.core.registry.read().expect("registry lock poisoned");
		let hosts = registry.hosts(key).ok_or(Error::ActorNotFound { type_key: key })?;

		let start = self.core.next.fetch_add(1, Ordering::Relaxed);
		for probe in 0..hosts.len() {
			let worker_id = hosts[start.wrapping_add(probe) % hosts.len()];
			if !workers[worker_id as usize].stopped.load(Ordering::Relaxed) {
				return Ok(worker_id);
			}
		}
		Err(Error::ActorNotFound { type_key: key })
	}

	fn push_failure(&self, err: PushError, key: TypeKey, entry: &WorkerEntry, worker_id: WorkerId) -> Error {
		match err {
			PushError::Full => Error::MailboxFull {
				type_key: key,
				worker_id,
			},
			PushError::Closed => {
				entry.stopped.store(true, Ordering::Relaxed);
				Error::WakeFailed { worker_id }
			}
		}
	}

	/// Transitions to Running and blocks until every worker thread has
	/// exited: a join barrier for the lifetime of the system.
	pub fn start(&self) -> Result<()> {
		{
			let mut lifecycle = self.core.lifecycle.lock().expect("lifecycle lock poisoned");
			match *lifecycle {
				Lifecycle::Setup => *lifecycle = Lifecycle::Running,
				Lifecycle::Running => return Err(Error::InvalidState("engine is already running")),
				Lifecycle::Draining | Lifecycle::Terminated => {
					return Err(Error::InvalidState("engine has been stopped"));
				}
			}
		}
		self.join_all();
		Ok(())
	}

	/// Requests shutdown without blocking: workers finish their current
	/// envelope, drop the rest (releasing parked callers with the null
	/// sentinel), and exit.
	///
	/// This is the variant that is safe to call from inside a handler.
	pub fn request_stop(&self) {
		let mut lifecycle = self.core.lifecycle.lock().expect("lifecycle lock poisoned");
		if matches!(*lifecycle, Lifecycle::Setup | Lifecycle::Running) {
			*lifecycle = Lifecycle::Draining;
			self.core.cancel.cancel();
			debug!("engine draining");
		}
	}

	/// Stops all workers and blocks until the engine is terminated.
	/// Idempotent: repeated stops observe the same terminated state.
	///
	/// Must not be called from inside a handler, since it joins the worker
	/// threads; use [`request_stop`](Engine::request_stop) there instead.
	pub fn stop(&self) -> Result<()> {
		self.request_stop();
		self.join_all();
		Ok(())
	}

	fn join_all(&self) {
		if self.core.joining.swap(true, Ordering::SeqCst) {
			// Another thread joins; wait for it to finish the transition.
			let mut lifecycle = self.core.lifecycle.lock().expect("lifecycle lock poisoned");
			while *lifecycle != Lifecycle::Terminated {
				lifecycle = self
					.core
					.lifecycle_changed
					.wait(lifecycle)
					.expect("lifecycle lock poisoned");
			}
			return;
		}

		let handles = mem::take(&mut *self.core.join_handles.lock().expect("join handle lock poisoned"));
		for handle in handles {
			let _ = handle.join();
		}

		let mut lifecycle = self.core.lifecycle.lock().expect("lifecycle lock poisoned");
		*lifecycle = Lifecycle::Terminated;
		self.core.lifecycle_changed.notify_all();
		debug!("engine terminated");
	}
}

impl Default for Engine {
	fn default() -> Self {
		Self::new()
	}
}

impl WorkerEntry {
	fn port(&self, key: TypeKey) -> &dyn MessagePort {
		self.ports
			.get(key)
			.expect("registry hosts always carry a port for their key")
			.as_ref()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::AtomicU32;
	use std::time::{Duration, Instant};

	use crate::actor::context::ActorScope;
	use crate::actor::traits::Handler;

	struct Tally {
		hits: Arc<AtomicU32>,
	}

	struct Tick;

	impl Handler for Tally {
		type Message = Tick;

		fn handle(&self, _scope: &mut ActorScope<'_>, _msg: Tick) -> Option<Payload> {
			self.hits.fetch_add(1, Ordering::SeqCst);
			None
		}
	}

	struct Nothing;

	fn wait_until(timeout: Duration, predicate: impl Fn() -> bool) {
		let deadline = Instant::now() + timeout;
		while !predicate() {
			assert!(Instant::now() < deadline, "condition not reached in time");
			thread::sleep(Duration::from_millis(1));
		}
	}

	#[test]
	fn test_send_without_hosts_fails() {
		let engine = Engine::new();
		match engine.send(Tick) {
			Err(Error::ActorNotFound { .. }) => {}
			other => panic!("expected ActorNotFound, got {other:?}"),
		}
		engine.stop().unwrap();
	}

	#[test]
	fn test_round_robin_counter_advances_once_per_send() {
		let engine = Engine::new();
		let hits = Arc::new(AtomicU32::new(0));

		let mut worker = Worker::new();
		worker.register_actor(Tally { hits: hits.clone() }).unwrap();
		engine.spawn(worker).unwrap();

		for _ in 0..10 {
			engine.send(Tick).unwrap();
		}
		assert_eq!(engine.core.next.load(Ordering::SeqCst), 10);

		wait_until(Duration::from_secs(5), || hits.load(Ordering::SeqCst) == 10);
		engine.stop().unwrap();
	}

	#[test]
	fn test_registry_order_equals_spawn_order() {
		let engine = Engine::new();
		let hits = Arc::new(AtomicU32::new(0));

		for _ in 0..3 {
			let mut worker = Worker::new();
			worker.register_actor(Tally { hits: hits.clone() }).unwrap();
			engine.spawn(worker).unwrap();
		}

		assert_eq!(engine.worker_count(), 3);
		assert_eq!(engine.hosts_of::<Tick>(), vec![0, 1, 2]);
		assert!(engine.hosts_of::<Nothing>().is_empty());
		engine.stop().unwrap();
	}

	#[test]
	fn test_spawn_after_stop_is_rejected() {
		let engine = Engine::new();
		engine.stop().unwrap();

		match engine.spawn(Worker::new()) {
			Err(Error::InvalidState(_)) => {}
			other => panic!("expected InvalidState, got {other:?}"),
		}
	}
}
