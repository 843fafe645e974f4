// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Troupe

//! Timer utilities for delayed and periodic message delivery.
//!
//! Timers route through the engine like any other send, so delivery is
//! load-balanced across the hosts of the message type. Each timer runs on
//! its own sleeping thread and holds an engine clone for as long as it is
//! armed.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crate::engine::Engine;

/// Handle to a scheduled timer.
///
/// Can be used to cancel the timer before it fires.
#[derive(Clone)]
pub struct TimerHandle {
	id: u64,
	cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
	fn new(id: u64) -> Self {
		Self {
			id,
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Cancel this timer.
	///
	/// If the timer has not fired yet, it will be cancelled.
	/// Returns `true` if the timer was successfully cancelled.
	pub fn cancel(&self) -> bool {
		self.cancelled
			.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.is_ok()
	}

	/// Check if this timer has been cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}

	/// Get the timer id.
	pub fn id(&self) -> u64 {
		self.id
	}
}

impl fmt::Debug for TimerHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TimerHandle")
			.field("id", &self.id)
			.field("cancelled", &self.is_cancelled())
			.finish()
	}
}

/// Counter for generating unique timer ids.
static TIMER_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_timer_id() -> u64 {
	TIMER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

impl Engine {
	/// Schedule a message to be sent through the engine after a delay.
	///
	/// Returns a handle that can be used to cancel the timer.
	pub fn schedule_once<M: Send + 'static>(&self, delay: Duration, msg: M) -> TimerHandle {
		let handle = TimerHandle::new(next_timer_id());
		let cancelled = handle.cancelled.clone();
		let engine = self.clone();

		thread::spawn(move || {
			thread::sleep(delay);

			if !cancelled.load(Ordering::SeqCst) {
				let _ = engine.send(msg);
			}
		});

		handle
	}

	/// Schedule a message to be sent through the engine repeatedly at an
	/// interval.
	///
	/// The timer runs until cancelled or until a delivery fails (no live
	/// host remains). Returns a handle that can be used to cancel it.
	pub fn schedule_repeat<M: Send + Clone + 'static>(&self, interval: Duration, msg: M) -> TimerHandle {
		let handle = TimerHandle::new(next_timer_id());
		let cancelled = handle.cancelled.clone();
		let engine = self.clone();

		thread::spawn(move || {
			loop {
				thread::sleep(interval);

				if cancelled.load(Ordering::SeqCst) {
					break;
				}

				if engine.send(msg.clone()).is_err() {
					break;
				}
			}
		});

		handle
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_cancel_is_one_shot() {
		let handle = TimerHandle::new(next_timer_id());
		assert!(!handle.is_cancelled());
		assert!(handle.cancel());
		assert!(!handle.cancel());
		assert!(handle.is_cancelled());
	}

	#[test]
	fn test_timer_ids_are_unique() {
		let a = next_timer_id();
		let b = next_timer_id();
		assert_ne!(a, b);
	}
}
