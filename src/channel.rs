//! Synchronous fan-out notification channel.
//!
//! Values are delivered inline, on the submitting thread, in registration
//! order. The subscriber list is copied out under the lock and the lock is
//! released before any subscriber runs, so a subscriber may freely subscribe,
//! unsubscribe or submit again from inside its own callback.

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
	Continue,
	/// Remove this subscriber after the current delivery.
	Cancel,
}

pub trait Subscriber<T>: Send + Sync {
	fn on_next(&self, value: &T) -> Flow;

	fn on_complete(&self) {}
}

/// Adapts a plain closure into a [`Subscriber`] that never cancels itself.
pub struct FnSubscriber<F>(F);

impl<F> FnSubscriber<F> {
	pub fn new(func: F) -> Self {
		FnSubscriber(func)
	}
}

impl<T, F> Subscriber<T> for FnSubscriber<F>
where
	F: Fn(&T) + Send + Sync,
{
	fn on_next(&self, value: &T) -> Flow {
		(self.0)(value);
		Flow::Continue
	}
}

pub(crate) trait Unsubscribe: Send + Sync {
	fn unsubscribe(&self, id: u64);
	fn contains(&self, id: u64) -> bool;
}

type Snapshot<T> = SmallVec<[(u64, Arc<dyn Subscriber<T>>); 4]>;

pub struct Channel<T: 'static> {
	inner: Mutex<ChannelInner<T>>,
	this: Weak<Channel<T>>,
}

struct ChannelInner<T: 'static> {
	subscribers: Vec<(u64, Arc<dyn Subscriber<T>>)>,
	next_id: u64,
	closed: bool,
}

impl<T: 'static> Channel<T> {
	pub fn new() -> Arc<Self> {
		Arc::new_cyclic(|this| Channel {
			inner: Mutex::new(ChannelInner {
				subscribers: Vec::new(),
				next_id: 0,
				closed: false,
			}),
			this: this.clone(),
		})
	}

	pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) -> Result<Subscription> {
		let mut inner = self.inner.lock();
		if inner.closed {
			return Err(Error::Closed);
		}

		let id = inner.next_id;
		inner.next_id += 1;
		inner.subscribers.push((id, subscriber));

		let channel = self.this.clone() as Weak<dyn Unsubscribe>;
		Ok(Subscription::new(id, channel))
	}

	pub fn submit(&self, value: &T) {
		let snapshot: Snapshot<T> = {
			let inner = self.inner.lock();
			if inner.closed {
				return;
			}
			inner.subscribers.iter().cloned().collect()
		};

		let mut cancelled: SmallVec<[u64; 2]> = SmallVec::new();
		for (id, subscriber) in snapshot {
			if subscriber.on_next(value) == Flow::Cancel {
				cancelled.push(id);
			}
		}

		if !cancelled.is_empty() {
			self.inner
				.lock()
				.subscribers
				.retain(|(id, _)| !cancelled.contains(id));
		}
	}

	pub fn has_subscribers(&self) -> bool {
		!self.inner.lock().subscribers.is_empty()
	}

	pub fn subscriber_count(&self) -> usize {
		self.inner.lock().subscribers.len()
	}

	pub fn is_closed(&self) -> bool {
		self.inner.lock().closed
	}

	/// Terminates the channel. Current subscribers receive `on_complete`,
	/// later submits are ignored and later subscribes fail with [`Error::Closed`].
	pub fn close(&self) {
		let subscribers = {
			let mut inner = self.inner.lock();
			if inner.closed {
				return;
			}
			inner.closed = true;
			std::mem::take(&mut inner.subscribers)
		};

		for (_, subscriber) in subscribers {
			subscriber.on_complete();
		}
	}
}

impl<T: 'static> Unsubscribe for Channel<T> {
	fn unsubscribe(&self, id: u64) {
		self.inner.lock().subscribers.retain(|(item, _)| *item != id);
	}

	fn contains(&self, id: u64) -> bool {
		self.inner.lock().subscribers.iter().any(|(item, _)| *item == id)
	}
}

impl<T: 'static> Debug for Channel<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let inner = self.inner.lock();
		f.debug_struct("Channel")
			.field("subscribers", &inner.subscribers.len())
			.field("closed", &inner.closed)
			.finish()
	}
}

/// Ownership token for one registration on a [`Channel`].
///
/// Dropping the token removes the subscriber. Use [`Subscription::detach`] to
/// keep it registered for as long as the channel lives.
#[must_use = "dropping a Subscription unsubscribes it immediately"]
pub struct Subscription {
	id: u64,
	channel: Option<Weak<dyn Unsubscribe>>,
}

impl Subscription {
	pub(crate) fn new(id: u64, channel: Weak<dyn Unsubscribe>) -> Self {
		Subscription {
			id,
			channel: Some(channel),
		}
	}

	/// True while the subscriber is still registered on a live channel.
	pub fn is_active(&self) -> bool {
		self.channel
			.as_ref()
			.and_then(|channel| channel.upgrade())
			.map_or(false, |channel| channel.contains(self.id))
	}

	pub fn unsubscribe(self) {}

	pub fn detach(mut self) {
		self.channel = None;
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(channel) = self.channel.take().and_then(|channel| channel.upgrade()) {
			channel.unsubscribe(self.id);
		}
	}
}

impl Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("active", &self.is_active())
			.finish()
	}
}
