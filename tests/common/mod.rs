// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Troupe

use std::thread;
use std::time::{Duration, Instant};

/// Polls the predicate until it holds, panicking once the timeout elapses.
pub fn wait_until(timeout: Duration, predicate: impl Fn() -> bool) {
	let deadline = Instant::now() + timeout;
	while !predicate() {
		assert!(Instant::now() < deadline, "condition not reached within {timeout:?}");
		thread::sleep(Duration::from_millis(1));
	}
}
