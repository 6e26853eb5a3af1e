//! Timers and debouncing
//!
//! Bindings never talk to a host timer API directly. They go through the
//! [`Scheduler`] trait, which a host implements on top of its own event loop
//! (`setTimeout` in a browser, a frame clock in a terminal UI).
//! [`EventLoop`] is the single-threaded virtual-time implementation used by
//! headless hosts and tests.
//!
//! ## Example
//!
//! ```
//! use formstate_core::debounce::{Debounce, EventLoop};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let event_loop = Rc::new(EventLoop::new());
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = seen.clone();
//! let debounce = Debounce::new(event_loop.clone(), Duration::from_millis(50), move |v: u32| {
//! 	sink.borrow_mut().push(v);
//! });
//!
//! debounce.schedule(1);
//! debounce.schedule(2);
//! event_loop.advance(Duration::from_millis(50));
//! assert_eq!(*seen.borrow(), vec![2]);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Handle of one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// One-shot task run by a [`Scheduler`]
pub type Task = Box<dyn FnOnce()>;

/// Host timer seam
pub trait Scheduler {
	/// Run `task` once, after `delay` has elapsed
	fn set_timeout(&self, delay: Duration, task: Task) -> TimerId;

	/// Drop a pending task. Clearing an elapsed or unknown timer is a no-op.
	fn clear_timeout(&self, id: TimerId);
}

/// Single-threaded virtual-time event loop
///
/// Time only moves when [`EventLoop::advance`] or
/// [`EventLoop::run_until_idle`] is called. Tasks due at the same instant run
/// in scheduling order. A task may schedule or clear other timers.
#[derive(Default)]
pub struct EventLoop {
	now: Cell<Duration>,
	next_id: Cell<u64>,
	// (deadline, id) keeps same-deadline tasks in scheduling order
	queue: RefCell<BTreeMap<(Duration, TimerId), Task>>,
}

impl EventLoop {
	/// Event loop at time zero with no timers
	pub fn new() -> Self {
		Self::default()
	}

	/// Elapsed virtual time
	pub fn now(&self) -> Duration {
		self.now.get()
	}

	/// Number of timers waiting to fire
	pub fn pending(&self) -> usize {
		self.queue.borrow().len()
	}

	/// Move time forward by `by`, running every task that falls due
	pub fn advance(&self, by: Duration) {
		let target = self.now.get() + by;
		while let Some(task) = self.pop_due(target) {
			task();
		}
		self.now.set(target);
	}

	/// Run tasks until the queue is empty, jumping time to each deadline
	pub fn run_until_idle(&self) {
		loop {
			let next = self.queue.borrow().keys().next().map(|(deadline, _)| *deadline);
			match next {
				Some(deadline) => self.advance(deadline.saturating_sub(self.now.get())),
				None => break,
			}
		}
	}

	fn pop_due(&self, target: Duration) -> Option<Task> {
		let mut queue = self.queue.borrow_mut();
		let key = *queue.keys().next()?;
		if key.0 > target {
			return None;
		}
		self.now.set(key.0);
		queue.remove(&key)
	}
}

impl Scheduler for EventLoop {
	fn set_timeout(&self, delay: Duration, task: Task) -> TimerId {
		let id = TimerId(self.next_id.get());
		self.next_id.set(id.0 + 1);
		self.queue.borrow_mut().insert((self.now.get() + delay, id), task);
		id
	}

	fn clear_timeout(&self, id: TimerId) {
		self.queue.borrow_mut().retain(|(_, timer), _| *timer != id);
	}
}

impl fmt::Debug for EventLoop {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventLoop")
			.field("now", &self.now.get())
			.field("pending", &self.pending())
			.finish()
	}
}

struct DebounceInner<A> {
	scheduler: Rc<dyn Scheduler>,
	delay: Duration,
	callback: Rc<dyn Fn(A)>,
	pending: Cell<Option<TimerId>>,
}

/// Cancelable debounced call
///
/// At most one call is pending at a time: scheduling again replaces the
/// pending arguments and restarts the delay. A zero delay runs synchronously.
/// Clones share the same pending timer.
pub struct Debounce<A: 'static> {
	inner: Rc<DebounceInner<A>>,
}

impl<A: 'static> Clone for Debounce<A> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<A: 'static> Debounce<A> {
	/// Debounce `callback` by `delay` on `scheduler`
	pub fn new(
		scheduler: Rc<dyn Scheduler>,
		delay: Duration,
		callback: impl Fn(A) + 'static,
	) -> Self {
		Self {
			inner: Rc::new(DebounceInner {
				scheduler,
				delay,
				callback: Rc::new(callback),
				pending: Cell::new(None),
			}),
		}
	}

	/// Configured delay
	pub fn delay(&self) -> Duration {
		self.inner.delay
	}

	/// Queue a call, replacing any pending one
	pub fn schedule(&self, args: A) {
		if self.inner.delay.is_zero() {
			self.cancel();
			(self.inner.callback)(args);
			return;
		}

		self.cancel();
		let weak = Rc::downgrade(&self.inner);
		let id = self.inner.scheduler.set_timeout(
			self.inner.delay,
			Box::new(move || {
				if let Some(inner) = weak.upgrade() {
					inner.pending.set(None);
					let callback = Rc::clone(&inner.callback);
					callback(args);
				}
			}),
		);
		self.inner.pending.set(Some(id));
	}

	/// Run the callback now, dropping any pending call
	pub fn flush_now(&self, args: A) {
		self.cancel();
		(self.inner.callback)(args);
	}

	/// Drop the pending call, if any
	pub fn cancel(&self) {
		if let Some(id) = self.inner.pending.take() {
			self.inner.scheduler.clear_timeout(id);
		}
	}

	/// Whether a scheduled call has not run yet
	pub fn is_pending(&self) -> bool {
		self.inner.pending.get().is_some()
	}
}

impl<A: 'static> fmt::Debug for Debounce<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Debounce")
			.field("delay", &self.inner.delay)
			.field("pending", &self.is_pending())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn event_loop() -> Rc<EventLoop> {
		Rc::new(EventLoop::new())
	}

	fn recorder(
		event_loop: &Rc<EventLoop>,
		delay_ms: u64,
	) -> (Debounce<&'static str>, Rc<RefCell<Vec<&'static str>>>) {
		let log = Rc::new(RefCell::new(Vec::new()));
		let sink = log.clone();
		let debounce = Debounce::new(
			event_loop.clone(),
			Duration::from_millis(delay_ms),
			move |v| sink.borrow_mut().push(v),
		);
		(debounce, log)
	}

	#[rstest]
	fn test_event_loop_runs_tasks_in_deadline_order(event_loop: Rc<EventLoop>) {
		let log = Rc::new(RefCell::new(Vec::new()));
		for (delay, label) in [(30, "c"), (10, "a"), (20, "b"), (10, "a2")] {
			let sink = log.clone();
			event_loop.set_timeout(
				Duration::from_millis(delay),
				Box::new(move || sink.borrow_mut().push(label)),
			);
		}

		event_loop.advance(Duration::from_millis(15));
		assert_eq!(*log.borrow(), vec!["a", "a2"]);
		assert_eq!(event_loop.now(), Duration::from_millis(15));

		event_loop.run_until_idle();
		assert_eq!(*log.borrow(), vec!["a", "a2", "b", "c"]);
		assert_eq!(event_loop.pending(), 0);
	}

	#[rstest]
	fn test_clear_timeout_drops_task(event_loop: Rc<EventLoop>) {
		let fired = Rc::new(Cell::new(false));
		let flag = fired.clone();
		let id = event_loop.set_timeout(Duration::from_millis(5), Box::new(move || flag.set(true)));
		event_loop.clear_timeout(id);
		event_loop.run_until_idle();
		assert!(!fired.get());
	}

	#[rstest]
	fn test_schedule_keeps_only_last_call(event_loop: Rc<EventLoop>) {
		let (debounce, log) = recorder(&event_loop, 100);
		debounce.schedule("first");
		event_loop.advance(Duration::from_millis(60));
		debounce.schedule("second");
		event_loop.advance(Duration::from_millis(60));
		assert!(log.borrow().is_empty());
		assert!(debounce.is_pending());

		event_loop.advance(Duration::from_millis(40));
		assert_eq!(*log.borrow(), vec!["second"]);
		assert!(!debounce.is_pending());
	}

	#[rstest]
	fn test_zero_delay_runs_synchronously(event_loop: Rc<EventLoop>) {
		let (debounce, log) = recorder(&event_loop, 0);
		debounce.schedule("now");
		assert_eq!(*log.borrow(), vec!["now"]);
		assert_eq!(event_loop.pending(), 0);
	}

	#[rstest]
	fn test_flush_now_replaces_pending_call(event_loop: Rc<EventLoop>) {
		let (debounce, log) = recorder(&event_loop, 100);
		debounce.schedule("stale");
		debounce.flush_now("fresh");
		event_loop.run_until_idle();
		assert_eq!(*log.borrow(), vec!["fresh"]);
	}

	#[rstest]
	fn test_cancel_prevents_call(event_loop: Rc<EventLoop>) {
		let (debounce, log) = recorder(&event_loop, 100);
		debounce.schedule("dropped");
		debounce.cancel();
		event_loop.run_until_idle();
		assert!(log.borrow().is_empty());
	}

	#[rstest]
	fn test_dropped_debounce_never_fires(event_loop: Rc<EventLoop>) {
		let (debounce, log) = recorder(&event_loop, 10);
		debounce.schedule("orphan");
		drop(debounce);
		event_loop.run_until_idle();
		assert!(log.borrow().is_empty());
	}
}
