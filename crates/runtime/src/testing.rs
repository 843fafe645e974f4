// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Troupe

//! Synchronous test harness for handlers.
//!
//! The harness stands in for a worker: messages are handled immediately on
//! the calling thread, replies come straight back, and the state slot can be
//! inspected between messages. No engine is attached, so scope re-entry
//! (`send`/`call`/`broadcast`) fails with an invalid-state error.
//!
//! # Example
//!
//! ```ignore
//! let mut harness = TestHarness::new(Counter);
//! harness.handle(CounterMsg::Increment);
//! harness.handle(CounterMsg::Increment);
//!
//! assert_eq!(*harness.state::<i64>().unwrap(), 2);
//! ```

use std::any::Any;

use crate::actor::context::{ActorScope, StateSlot, WorkerContext};
use crate::actor::traits::{Handler, Payload};

/// Drives a single handler synchronously, without threads or mailboxes.
pub struct TestHarness<H: Handler> {
	handler: H,
	state: StateSlot,
	ctx: WorkerContext,
}

impl<H: Handler> TestHarness<H> {
	pub fn new(handler: H) -> Self {
		Self {
			handler,
			state: StateSlot::new(),
			ctx: WorkerContext::detached(),
		}
	}

	/// Handle one message, returning the handler's reply.
	pub fn handle(&mut self, msg: H::Message) -> Option<Payload> {
		let mut scope = ActorScope::new(&self.ctx, &mut self.state);
		self.handler.handle(&mut scope, msg)
	}

	/// The actor's state, if one of type `S` was installed.
	pub fn state<S: Any + Send>(&mut self) -> Option<&mut S> {
		self.state.get::<S>()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Counter;

	enum CounterMsg {
		Increment,
		Get,
	}

	impl Handler for Counter {
		type Message = CounterMsg;

		fn handle(&self, scope: &mut ActorScope<'_>, msg: CounterMsg) -> Option<Payload> {
			match msg {
				CounterMsg::Increment => {
					match scope.state::<i64>() {
						Some(count) => *count += 1,
						None => scope.set_state(1i64),
					}
					None
				}
				CounterMsg::Get => {
					let count = scope.state::<i64>().map(|count| *count).unwrap_or(0);
					Some(Box::new(count))
				}
			}
		}
	}

	#[test]
	fn test_harness_drives_handler_synchronously() {
		let mut harness = TestHarness::new(Counter);

		assert!(harness.handle(CounterMsg::Increment).is_none());
		assert!(harness.handle(CounterMsg::Increment).is_none());

		let reply = harness.handle(CounterMsg::Get).unwrap();
		assert_eq!(*reply.downcast::<i64>().unwrap(), 2);
		assert_eq!(*harness.state::<i64>().unwrap(), 2);
	}

	#[test]
	fn test_harness_scope_has_no_engine() {
		struct Probe;

		impl Handler for Probe {
			type Message = ();

			fn handle(&self, scope: &mut ActorScope<'_>, _msg: ()) -> Option<Payload> {
				Some(Box::new(scope.engine().is_err()))
			}
		}

		let mut harness = TestHarness::new(Probe);
		let reply = harness.handle(()).unwrap();
		assert!(*reply.downcast::<bool>().unwrap());
	}
}
