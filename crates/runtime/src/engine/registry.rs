// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Troupe

//! Message-type registry and routing keys.

use std::any::type_name;
use std::collections::HashMap;

/// Stable per-process identifier for a message type.
///
/// Derived from the compiler's type name, which includes the module path, so
/// distinct message types never collide, including across crates. Opaque
/// everywhere outside routing.
pub type TypeKey = &'static str;

/// Dense identifier of a worker within one engine, assigned in spawn order.
pub type WorkerId = u32;

/// Derives the routing key for a message type.
pub fn type_key<T: 'static>() -> TypeKey {
	type_name::<T>()
}

/// Maps a type-key to the ordered list of workers hosting an actor for it.
///
/// Built incrementally while workers are spawned: each spawn appends the
/// worker's id to the list of every type it hosts, so per-key order equals
/// spawn order. Lists are never mutated after spawning completes and never
/// contain duplicates (a worker hosts at most one actor per type).
#[derive(Default)]
pub(crate) struct Registry {
	hosts: HashMap<TypeKey, Vec<WorkerId>>,
}

impl Registry {
	pub(crate) fn add_host(&mut self, key: TypeKey, worker_id: WorkerId) {
		self.hosts.entry(key).or_default().push(worker_id);
	}

	pub(crate) fn hosts(&self, key: TypeKey) -> Option<&[WorkerId]> {
		self.hosts.get(key).map(Vec::as_slice)
	}
}
