// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Troupe

//! Actor instances and mailbox drain.
//!
//! [`RunnerSlot`] erases the handler's message type so that a worker can
//! host actors of different message types in one container and wait on all
//! of their mailboxes at once.

use crossbeam_channel::{Receiver, Select};
use tracing::{debug, warn};

use crate::actor::context::{ActorScope, StateSlot, WorkerContext};
use crate::actor::mailbox::Envelope;
use crate::actor::traits::Handler;
use crate::engine::registry::{TypeKey, type_key};

/// One registered actor as seen by its worker's event loop.
pub(crate) trait RunnerSlot: Send {
	fn type_key(&self) -> TypeKey;

	/// Adds this actor's mailbox to the worker's select set.
	fn register<'a>(&'a self, select: &mut Select<'a>);

	/// Pops and handles envelopes until the mailbox is empty or the worker
	/// is cancelled. Never yields mid-envelope.
	fn drain(&mut self, ctx: &WorkerContext);

	/// Drops all pending envelopes, releasing any blocked callers with the
	/// null sentinel.
	fn discard_pending(&mut self);
}

/// A handler bound to its mailbox and state slot.
pub(crate) struct ActorInstance<H: Handler> {
	handler: H,
	state: StateSlot,
	mailbox: Receiver<Envelope<H::Message>>,
}

impl<H: Handler> ActorInstance<H> {
	pub(crate) fn new(handler: H, mailbox: Receiver<Envelope<H::Message>>) -> Self {
		Self {
			handler,
			state: StateSlot::new(),
			mailbox,
		}
	}
}

impl<H: Handler> RunnerSlot for ActorInstance<H> {
	fn type_key(&self) -> TypeKey {
		type_key::<H::Message>()
	}

	fn register<'a>(&'a self, select: &mut Select<'a>) {
		select.recv(&self.mailbox);
	}

	fn drain(&mut self, ctx: &WorkerContext) {
		while !ctx.is_cancelled() {
			let envelope = match self.mailbox.try_recv() {
				Ok(envelope) => envelope,
				Err(_) => break,
			};

			match envelope {
				Envelope::OneWay(msg) => {
					let mut scope = ActorScope::new(ctx, &mut self.state);
					// Replies are only meaningful for calls.
					let _ = self.handler.handle(&mut scope, msg);
				}
				Envelope::Call(msg, reply) => {
					let value = {
						let mut scope = ActorScope::new(ctx, &mut self.state);
						self.handler.handle(&mut scope, msg)
					};
					if value.is_none() {
						warn!(
							type_key = self.type_key(),
							worker = ctx.worker_id(),
							"call handler produced no reply, releasing the caller with a null payload"
						);
					}
					if !reply.send(value) {
						debug!(type_key = self.type_key(), "reply slot already satisfied, dropping reply");
					}
				}
			}
		}
	}

	fn discard_pending(&mut self) {
		let mut dropped = 0usize;
		while let Ok(envelope) = self.mailbox.try_recv() {
			if let Envelope::Call(_, reply) = envelope {
				reply.send(None);
			}
			dropped += 1;
		}
		if dropped > 0 {
			debug!(type_key = self.type_key(), dropped, "discarded pending envelopes during shutdown");
		}
	}
}
