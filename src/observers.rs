use std::sync::Arc;

use parking_lot::RwLock;

use crate::channel::{Channel, Subscriber, Subscription};
use crate::error::{Error, Result};

/// The change and invalidation channels shared by every cell.
///
/// Channels are allocated on first subscription. Publishing takes a snapshot
/// of the channel reference under the read lock and releases it before any
/// subscriber runs.
pub struct Observers<T: 'static> {
	channels: RwLock<Channels<T>>,
}

struct Channels<T: 'static> {
	on_change: Option<Arc<Channel<T>>>,
	on_invalidate: Option<Arc<Channel<()>>>,
	closed: bool,
}

impl<T: 'static> Default for Observers<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: 'static> Observers<T> {
	pub fn new() -> Self {
		Observers {
			channels: RwLock::new(Channels {
				on_change: None,
				on_invalidate: None,
				closed: false,
			}),
		}
	}

	pub fn subscribe_on_change(&self, subscriber: Arc<dyn Subscriber<T>>) -> Result<Subscription> {
		let channel = {
			let mut channels = self.channels.write();
			if channels.closed {
				return Err(Error::Closed);
			}
			channels.on_change.get_or_insert_with(Channel::new).clone()
		};
		channel.subscribe(subscriber)
	}

	pub fn subscribe_on_invalidate(
		&self,
		subscriber: Arc<dyn Subscriber<()>>,
	) -> Result<Subscription> {
		let channel = {
			let mut channels = self.channels.write();
			if channels.closed {
				return Err(Error::Closed);
			}
			channels.on_invalidate.get_or_insert_with(Channel::new).clone()
		};
		channel.subscribe(subscriber)
	}

	pub fn fire_change(&self, value: &T) {
		let channel = self.channels.read().on_change.clone();
		if let Some(channel) = channel {
			channel.submit(value);
		}
	}

	pub fn fire_invalidation(&self) {
		let channel = self.channels.read().on_invalidate.clone();
		if let Some(channel) = channel {
			channel.submit(&());
		}
	}

	/// True iff somebody is listening for changes, which makes a derived cell
	/// recompute as soon as it is invalidated instead of on the next read.
	pub fn is_eager_required(&self) -> bool {
		let channel = self.channels.read().on_change.clone();
		channel.map_or(false, |channel| channel.has_subscribers())
	}

	pub fn change_subscribers(&self) -> usize {
		let channel = self.channels.read().on_change.clone();
		channel.map_or(0, |channel| channel.subscriber_count())
	}

	pub fn invalidation_subscribers(&self) -> usize {
		let channel = self.channels.read().on_invalidate.clone();
		channel.map_or(0, |channel| channel.subscriber_count())
	}

	pub fn is_closed(&self) -> bool {
		self.channels.read().closed
	}

	pub fn close(&self) {
		let (on_change, on_invalidate) = {
			let mut channels = self.channels.write();
			if channels.closed {
				return;
			}
			channels.closed = true;
			(channels.on_change.clone(), channels.on_invalidate.clone())
		};

		if let Some(channel) = on_invalidate {
			channel.close();
		}
		if let Some(channel) = on_change {
			channel.close();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::channel::FnSubscriber;
	use parking_lot::Mutex;

	#[test]
	fn channels_are_lazy() {
		let observers = Observers::<i32>::new();
		assert!(!observers.is_eager_required());
		assert_eq!(observers.change_subscribers(), 0);
		assert_eq!(observers.invalidation_subscribers(), 0);

		// nobody listens, nothing is allocated
		observers.fire_change(&1);
		observers.fire_invalidation();
	}

	#[test]
	fn eager_follows_live_change_subscribers() {
		let observers = Observers::<i32>::new();

		let token = observers
			.subscribe_on_change(Arc::new(FnSubscriber::new(|_: &i32| {})))
			.unwrap();
		assert!(observers.is_eager_required());

		drop(token);
		assert!(!observers.is_eager_required());
	}

	#[test]
	fn invalidation_subscribers_do_not_make_it_eager() {
		let observers = Observers::<i32>::new();
		let _token = observers
			.subscribe_on_invalidate(Arc::new(FnSubscriber::new(|_: &()| {})))
			.unwrap();

		assert!(!observers.is_eager_required());
		assert_eq!(observers.invalidation_subscribers(), 1);
	}

	#[test]
	fn subscriber_can_subscribe_while_being_notified() {
		let observers = Arc::new(Observers::<i32>::new());
		let tokens = Arc::new(Mutex::new(Vec::new()));

		let _token = {
			let weak = Arc::downgrade(&observers);
			let tokens = tokens.clone();
			observers
				.subscribe_on_change(Arc::new(FnSubscriber::new(move |_: &i32| {
					if let Some(observers) = weak.upgrade() {
						let token = observers
							.subscribe_on_invalidate(Arc::new(FnSubscriber::new(|_: &()| {})));
						tokens.lock().push(token);
					}
				})))
				.unwrap()
		};

		observers.fire_change(&1);
		assert_eq!(observers.invalidation_subscribers(), 1);
	}

	#[test]
	fn close_rejects_further_subscriptions() {
		let observers = Observers::<i32>::new();
		observers.close();

		assert!(observers.is_closed());
		assert!(matches!(
			observers.subscribe_on_change(Arc::new(FnSubscriber::new(|_: &i32| {}))),
			Err(Error::Closed)
		));
		assert!(matches!(
			observers.subscribe_on_invalidate(Arc::new(FnSubscriber::new(|_: &()| {}))),
			Err(Error::Closed)
		));
	}
}
