// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Troupe

//! Error types surfaced at the runtime API boundary.

use crate::engine::registry::{TypeKey, WorkerId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// No worker hosts an actor for the message type.
	#[error("no actor registered for message type `{type_key}`")]
	ActorNotFound { type_key: TypeKey },

	/// The selected actor's mailbox is at capacity.
	#[error("mailbox full for message type `{type_key}` on worker {worker_id}")]
	MailboxFull { type_key: TypeKey, worker_id: WorkerId },

	/// A call was released with a null payload: the handler produced no
	/// reply, or the envelope was discarded during shutdown.
	#[error("call produced no reply")]
	NoResponse,

	/// A second actor for the same message type was registered on one worker.
	#[error("an actor for message type `{type_key}` is already registered on this worker")]
	DuplicateActorType { type_key: TypeKey },

	/// The engine's worker cap was reached.
	#[error("worker limit reached ({limit})")]
	TooManyWorkers { limit: usize },

	/// The worker's mailboxes can no longer be signalled; fatal for that
	/// worker, the engine keeps serving the others.
	#[error("worker {worker_id} is no longer accepting envelopes")]
	WakeFailed { worker_id: WorkerId },

	/// A call issued from inside a handler selected the calling worker,
	/// which would deadlock the worker against itself.
	#[error("call for message type `{type_key}` would target the calling worker {worker_id}")]
	SelfCall { type_key: TypeKey, worker_id: WorkerId },

	/// Operation is invalid for the current engine state.
	#[error("operation is invalid for the current engine state: {0}")]
	InvalidState(&'static str),
}
