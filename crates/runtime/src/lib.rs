// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Troupe

//! Core of the troupe actor runtime.
//!
//! A small library for declaring typed message handlers, running many of
//! them concurrently across worker threads, and routing messages between
//! them with load balancing, broadcast, and synchronous request/reply.
//!
//! # Execution Model
//!
//! - **One OS thread per worker**: each [`Worker`] runs a single-threaded
//!   event loop over its actors; handlers on one worker never run
//!   concurrently. Uses `std::thread` and `crossbeam-channel`, not async.
//! - **Typed routing**: the [`Engine`] maps each message type to the workers
//!   hosting an actor for it and picks one (round-robin) or all of them.
//! - **Request/reply**: a call blocks its caller on a one-shot reply cell
//!   until the handler's reply (or the shutdown sentinel) arrives.
//!
//! # Ordering Guarantees
//!
//! Per-actor order equals enqueue order, and each producer's messages reach
//! an actor in that producer's submission order. Nothing is promised across
//! actors or across producers.
//!
//! # Example
//!
//! ```ignore
//! use troupe_runtime::{ActorScope, Engine, Handler, Payload, Worker};
//!
//! struct Adder;
//!
//! struct Sum {
//!     a: i64,
//!     b: i64,
//! }
//!
//! impl Handler for Adder {
//!     type Message = Sum;
//!
//!     fn handle(&self, _scope: &mut ActorScope<'_>, msg: Sum) -> Option<Payload> {
//!         Some(Box::new(msg.a + msg.b))
//!     }
//! }
//!
//! let engine = Engine::new();
//!
//! let mut worker = Worker::new();
//! worker.register_actor(Adder)?;
//! engine.spawn(worker)?;
//!
//! let reply = engine.call(Sum { a: 10, b: 5 })?;
//! assert_eq!(*reply.downcast::<i64>().unwrap(), 15);
//!
//! engine.stop()?;
//! ```

pub mod actor;
pub mod engine;
pub mod error;
pub mod sync;
pub mod testing;
pub mod worker;

pub use actor::context::{ActorScope, CancellationToken, WorkerContext};
pub use actor::traits::{ActorConfig, Handler, MAILBOX_CAPACITY_DEFAULT, MAILBOX_CAPACITY_MIN, Payload};
pub use engine::registry::{TypeKey, WorkerId, type_key};
pub use engine::timers::TimerHandle;
pub use engine::{Engine, WORKER_LIMIT};
pub use error::{Error, Result};
pub use sync::oneshot::OneShot;
pub use testing::TestHarness;
pub use worker::Worker;
