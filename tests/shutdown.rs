// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Troupe

//! Lifecycle: graceful shutdown, parked-caller release, idempotent stop.

mod common;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use common::wait_until;
use troupe::{ActorScope, Engine, Error, Handler, Payload, Worker};

enum Task {
	Block,
	Answer,
}

/// Blocks inside the handler until the test opens the gate.
struct Gated {
	started: mpsc::Sender<()>,
	gate: mpsc::Receiver<()>,
}

impl Handler for Gated {
	type Message = Task;

	fn handle(&self, _scope: &mut ActorScope<'_>, msg: Task) -> Option<Payload> {
		match msg {
			Task::Block => {
				self.started.send(()).unwrap();
				let _ = self.gate.recv();
				None
			}
			Task::Answer => Some(Box::new(42i64)),
		}
	}
}

#[test]
fn test_stop_releases_parked_callers() {
	let engine = Engine::new();
	let (started_tx, started_rx) = mpsc::channel();
	let (gate_tx, gate_rx) = mpsc::channel();

	let mut worker = Worker::new();
	worker
		.register_actor(Gated {
			started: started_tx,
			gate: gate_rx,
		})
		.unwrap();
	engine.spawn(worker).unwrap();

	// Occupy the worker so the call below stays queued.
	engine.send(Task::Block).unwrap();
	started_rx.recv().unwrap();

	let caller = {
		let engine = engine.clone();
		thread::spawn(move || engine.call(Task::Answer))
	};
	// Let the call get enqueued behind the blocked envelope.
	thread::sleep(Duration::from_millis(50));

	let stopper = {
		let engine = engine.clone();
		thread::spawn(move || engine.stop())
	};
	thread::sleep(Duration::from_millis(50));

	// Unblock the in-flight envelope; shutdown then discards the queued
	// call and must release the parked caller.
	gate_tx.send(()).unwrap();

	stopper.join().unwrap().unwrap();
	match caller.join().unwrap() {
		Err(Error::NoResponse) => {}
		Ok(_) => panic!("expected NoResponse, got a payload"),
		Err(other) => panic!("expected NoResponse, got {other:?}"),
	}
}

struct Idle;

impl Handler for Idle {
	type Message = u8;

	fn handle(&self, _scope: &mut ActorScope<'_>, _msg: u8) -> Option<Payload> {
		None
	}
}

#[test]
fn test_stop_is_idempotent() {
	let engine = Engine::new();

	let mut worker = Worker::new();
	worker.register_actor(Idle).unwrap();
	engine.spawn(worker).unwrap();

	engine.stop().unwrap();
	engine.stop().unwrap();

	match engine.start() {
		Err(Error::InvalidState(_)) => {}
		other => panic!("expected InvalidState after stop, got {other:?}"),
	}
}

#[test]
fn test_start_is_a_join_barrier() {
	let engine = Engine::new();

	let mut worker = Worker::new();
	worker.register_actor(Idle).unwrap();
	engine.spawn(worker).unwrap();

	let starter = {
		let engine = engine.clone();
		thread::spawn(move || engine.start())
	};

	thread::sleep(Duration::from_millis(50));
	assert!(!starter.is_finished(), "start must block while workers run");

	engine.stop().unwrap();
	starter.join().unwrap().unwrap();
}

struct Quitter;

struct Quit;

impl Handler for Quitter {
	type Message = Quit;

	fn handle(&self, scope: &mut ActorScope<'_>, _msg: Quit) -> Option<Payload> {
		scope.engine().unwrap().request_stop();
		None
	}
}

#[test]
fn test_handler_can_request_stop() {
	let engine = Engine::new();

	let mut worker = Worker::new();
	worker.register_actor(Quitter).unwrap();
	engine.spawn(worker).unwrap();

	engine.send(Quit).unwrap();

	// The worker winds down on its own; deliveries start failing once its
	// mailboxes close.
	wait_until(Duration::from_secs(5), || engine.send(Quit).is_err());

	engine.stop().unwrap();
}
