// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Troupe

//! Mailbox construction and the engine-side message ports.
//!
//! A mailbox is a bounded channel of envelopes local to one actor instance:
//! multiple producers (any thread going through the engine), one consumer
//! (the owning worker's drain). A successful push doubles as the worker's
//! wake signal. Pushing to a full mailbox fails cleanly instead of blocking
//! the producer.

use std::any::Any;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::actor::traits::Payload;
use crate::sync::oneshot::OneShot;

/// Value transported on a call's reply channel.
///
/// `None` is the null sentinel a worker posts when the handler produced no
/// reply, or when the envelope was discarded during shutdown; it always
/// releases the blocked caller.
pub type CallReply = Option<Payload>;

/// Reply channel shared between a blocked caller and the target worker.
pub type ReplySlot = Arc<OneShot<CallReply>>;

/// Internal carrier for either a one-way message or a call.
///
/// Owned by the mailbox between enqueue and dequeue; ownership of the
/// message passes to the handler on dequeue.
pub(crate) enum Envelope<M> {
	OneWay(M),
	Call(M, ReplySlot),
}

/// Creates a bounded mailbox channel pair.
pub(crate) fn create_mailbox<M>(capacity: usize) -> (Sender<Envelope<M>>, Receiver<Envelope<M>>) {
	bounded(capacity)
}

/// Outcome of a raw push, before the engine attaches routing context.
#[derive(Debug)]
pub(crate) enum PushError {
	/// The mailbox is at capacity.
	Full,
	/// The runner is gone; nothing will drain this mailbox again.
	Closed,
}

/// Type-erased enqueue side of one actor's mailbox, held by the engine.
pub(crate) trait MessagePort: Send + Sync {
	fn push_one_way(&self, payload: Box<dyn Any + Send>) -> Result<(), PushError>;
	fn push_call(&self, payload: Box<dyn Any + Send>, reply: ReplySlot) -> Result<(), PushError>;
}

pub(crate) struct Port<M> {
	tx: Sender<Envelope<M>>,
}

impl<M> Port<M> {
	pub(crate) fn new(tx: Sender<Envelope<M>>) -> Self {
		Self { tx }
	}
}

impl<M: Send + 'static> MessagePort for Port<M> {
	fn push_one_way(&self, payload: Box<dyn Any + Send>) -> Result<(), PushError> {
		let msg = payload
			.downcast::<M>()
			.expect("port is looked up under the payload's type key");
		self.tx.try_send(Envelope::OneWay(*msg)).map_err(into_push_error)
	}

	fn push_call(&self, payload: Box<dyn Any + Send>, reply: ReplySlot) -> Result<(), PushError> {
		let msg = payload
			.downcast::<M>()
			.expect("port is looked up under the payload's type key");
		self.tx.try_send(Envelope::Call(*msg, reply)).map_err(into_push_error)
	}
}

fn into_push_error<M>(err: TrySendError<Envelope<M>>) -> PushError {
	match err {
		TrySendError::Full(_) => PushError::Full,
		TrySendError::Disconnected(_) => PushError::Closed,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pop_order_equals_push_order() {
		let (tx, rx) = create_mailbox::<u32>(100);
		let port = Port::new(tx);

		for i in 0..10u32 {
			port.push_one_way(Box::new(i)).unwrap();
		}

		for i in 0..10u32 {
			match rx.try_recv().unwrap() {
				Envelope::OneWay(got) => assert_eq!(got, i),
				Envelope::Call(..) => panic!("expected a one-way envelope"),
			}
		}
		assert!(rx.try_recv().is_err());
	}

	#[test]
	fn test_push_to_full_mailbox_fails() {
		let (tx, _rx) = create_mailbox::<u32>(64);
		let port = Port::new(tx);

		for i in 0..64u32 {
			assert!(port.push_one_way(Box::new(i)).is_ok());
		}

		match port.push_one_way(Box::new(64u32)) {
			Err(PushError::Full) => {}
			_ => panic!("expected the mailbox to be full"),
		}
	}

	#[test]
	fn test_push_to_closed_mailbox_fails() {
		let (tx, rx) = create_mailbox::<u32>(64);
		let port = Port::new(tx);
		drop(rx);

		match port.push_one_way(Box::new(0u32)) {
			Err(PushError::Closed) => {}
			_ => panic!("expected the mailbox to be closed"),
		}
	}

	#[test]
	fn test_call_envelope_carries_its_reply_slot() {
		let (tx, rx) = create_mailbox::<&'static str>(64);
		let port = Port::new(tx);

		let reply: ReplySlot = Arc::new(OneShot::new());
		port.push_call(Box::new("ping"), reply.clone()).unwrap();

		match rx.try_recv().unwrap() {
			Envelope::Call(msg, slot) => {
				assert_eq!(msg, "ping");
				slot.send(Some(Box::new("pong")));
			}
			Envelope::OneWay(_) => panic!("expected a call envelope"),
		}

		let payload = reply.receive().unwrap().unwrap();
		assert_eq!(*payload.downcast::<&'static str>().unwrap(), "pong");
	}
}
