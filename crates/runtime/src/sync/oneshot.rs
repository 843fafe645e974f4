// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Troupe

//! Single-producer, single-consumer one-shot cell.
//!
//! Transports exactly one value between one sender and one receiver with a
//! four-state atomic machine:
//!
//! ```text
//! Empty -send-> Writing -store-> Ready -receive-> Consumed
//! ```
//!
//! `send` succeeds at most once; `receive` yields the value at most once and
//! returns `None` once the cell is consumed. The receiver spins with a CPU
//! pause hint (yielding the thread periodically), which keeps request/reply
//! latency in the sub-microsecond range for prompt handlers.

use std::cell::UnsafeCell;
use std::fmt;
use std::hint;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;
const CONSUMED: u8 = 3;

/// Spins between thread yields while waiting for the value.
const SPINS_PER_YIELD: u32 = 1024;

/// A one-shot cell holding at most one `T`.
pub struct OneShot<T> {
	state: AtomicU8,
	value: UnsafeCell<Option<T>>,
}

// SAFETY: the value slot is accessed exclusively by whichever thread wins the
// Empty -> Writing or Ready -> Consumed transition; the state machine hands
// the slot over with release/acquire ordering.
unsafe impl<T: Send> Send for OneShot<T> {}
unsafe impl<T: Send> Sync for OneShot<T> {}

impl<T> OneShot<T> {
	/// Creates an empty cell.
	pub fn new() -> Self {
		Self {
			state: AtomicU8::new(EMPTY),
			value: UnsafeCell::new(None),
		}
	}

	/// Stores the value if the cell is still empty.
	///
	/// Returns `false` without storing if a send already happened (in any
	/// stage) or the value was already consumed.
	pub fn send(&self, value: T) -> bool {
		if self
			.state
			.compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
			.is_err()
		{
			return false;
		}

		// SAFETY: winning Empty -> Writing grants exclusive slot access.
		unsafe { *self.value.get() = Some(value) };
		self.state.store(READY, Ordering::Release);
		true
	}

	/// Blocks until a value is ready and takes it.
	///
	/// Returns `None` if the value was already consumed (by this or any
	/// other receiver).
	pub fn receive(&self) -> Option<T> {
		let mut spins: u32 = 0;
		loop {
			match self.state.load(Ordering::Acquire) {
				READY => {
					if self
						.state
						.compare_exchange(READY, CONSUMED, Ordering::Acquire, Ordering::Relaxed)
						.is_ok()
					{
						// SAFETY: winning Ready -> Consumed grants exclusive slot access.
						return unsafe { (*self.value.get()).take() };
					}
				}
				CONSUMED => return None,
				_ => {
					spins = spins.wrapping_add(1);
					if spins % SPINS_PER_YIELD == 0 {
						thread::yield_now();
					} else {
						hint::spin_loop();
					}
				}
			}
		}
	}

	/// Takes the value if it is ready right now.
	pub fn try_receive(&self) -> Option<T> {
		if self
			.state
			.compare_exchange(READY, CONSUMED, Ordering::Acquire, Ordering::Relaxed)
			.is_ok()
		{
			// SAFETY: winning Ready -> Consumed grants exclusive slot access.
			return unsafe { (*self.value.get()).take() };
		}
		None
	}

	/// No send has started yet.
	pub fn is_empty(&self) -> bool {
		self.state.load(Ordering::Acquire) == EMPTY
	}

	/// A value is stored and not yet consumed.
	pub fn is_ready(&self) -> bool {
		self.state.load(Ordering::Acquire) == READY
	}

	/// The value has been taken; the cell is terminal.
	pub fn is_consumed(&self) -> bool {
		self.state.load(Ordering::Acquire) == CONSUMED
	}
}

impl<T> Default for OneShot<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> fmt::Debug for OneShot<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = match self.state.load(Ordering::Acquire) {
			EMPTY => "empty",
			WRITING => "writing",
			READY => "ready",
			_ => "consumed",
		};
		f.debug_struct("OneShot").field("state", &state).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	#[test]
	fn test_send_receive_roundtrip() {
		let cell = OneShot::new();
		assert!(cell.is_empty());

		assert!(cell.send(42));
		assert!(cell.is_ready());

		assert_eq!(cell.receive(), Some(42));
		assert!(cell.is_consumed());
	}

	#[test]
	fn test_second_send_is_rejected() {
		let cell = OneShot::new();
		assert!(cell.send(1));
		assert!(!cell.send(2));
		assert_eq!(cell.receive(), Some(1));
		assert!(!cell.send(3));
	}

	#[test]
	fn test_receive_after_consumed_returns_none() {
		let cell = OneShot::new();
		cell.send("reply");
		assert_eq!(cell.receive(), Some("reply"));
		assert_eq!(cell.receive(), None);
		assert_eq!(cell.try_receive(), None);
	}

	#[test]
	fn test_try_receive_on_empty_cell() {
		let cell: OneShot<u8> = OneShot::new();
		assert_eq!(cell.try_receive(), None);
		assert!(cell.is_empty());
	}

	#[test]
	fn test_exactly_one_concurrent_send_succeeds() {
		let cell = Arc::new(OneShot::new());

		let senders: Vec<_> = (0..8)
			.map(|i| {
				let cell = cell.clone();
				thread::spawn(move || cell.send(i))
			})
			.collect();

		let succeeded = senders
			.into_iter()
			.map(|handle| handle.join().unwrap())
			.filter(|&sent| sent)
			.count();

		assert_eq!(succeeded, 1);
		assert!(cell.receive().is_some());
	}

	#[test]
	fn test_exactly_one_concurrent_receiver_gets_the_value() {
		let cell = Arc::new(OneShot::new());

		let first = {
			let cell = cell.clone();
			thread::spawn(move || cell.receive())
		};
		let second = {
			let cell = cell.clone();
			thread::spawn(move || cell.receive())
		};

		assert!(cell.send(7u64));

		let results = [first.join().unwrap(), second.join().unwrap()];
		assert!(results.contains(&Some(7)));
		assert!(results.contains(&None));
		assert!(cell.is_consumed());
	}
}
