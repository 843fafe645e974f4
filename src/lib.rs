// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Troupe

//! # Troupe
//!
//! A typed multi-threaded actor runtime: declare message handlers, run many
//! of them concurrently across worker threads, and route messages between
//! them with load balancing, broadcast, and synchronous request/reply.
//!
//! ## Core Concepts
//!
//! - **[`Handler`]**: one handler per message type; implementing it declares
//!   an actor. State lives in the per-actor slot on the [`ActorScope`].
//! - **[`Worker`]**: an OS thread hosting one actor per message type it
//!   registered; dispatch within a worker is strictly sequential.
//! - **[`Engine`]**: owns the workers and the type registry; entry point for
//!   `send` (round-robin), `call` (request/reply) and `broadcast`.
//!
//! ## Example
//!
//! ```ignore
//! use troupe::{ActorScope, Engine, Handler, Payload, Worker};
//!
//! struct Greeter;
//!
//! struct Greet {
//!     name: String,
//! }
//!
//! impl Handler for Greeter {
//!     type Message = Greet;
//!
//!     fn handle(&self, scope: &mut ActorScope<'_>, msg: Greet) -> Option<Payload> {
//!         // Count greetings in the per-actor state slot.
//!         match scope.state::<u64>() {
//!             Some(count) => *count += 1,
//!             None => scope.set_state(1u64),
//!         }
//!         Some(Box::new(format!("hello, {}", msg.name)))
//!     }
//! }
//!
//! fn main() -> troupe::Result<()> {
//!     let engine = Engine::new();
//!
//!     // Two workers hosting the same message type: calls and sends are
//!     // load-balanced between them round-robin.
//!     for _ in 0..2 {
//!         let mut worker = Worker::new();
//!         worker.register_actor(Greeter)?;
//!         engine.spawn(worker)?;
//!     }
//!
//!     let reply = engine.call(Greet { name: "ada".into() })?;
//!     assert_eq!(*reply.downcast::<String>().unwrap(), "hello, ada");
//!
//!     engine.stop()
//! }
//! ```

pub use troupe_runtime::{
	ActorConfig, ActorScope, CancellationToken, Engine, Error, Handler, MAILBOX_CAPACITY_DEFAULT,
	MAILBOX_CAPACITY_MIN, OneShot, Payload, Result, TestHarness, TimerHandle, TypeKey, WORKER_LIMIT, Worker,
	WorkerContext, WorkerId, type_key,
};
