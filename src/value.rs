use std::fmt::Debug;
use std::sync::Arc;

use crate::channel::{FnSubscriber, Subscriber, Subscription};
use crate::error::Result;
use crate::pipe::Pipe;
use crate::{CellId, Observable};

/// Typed side of a cell.
pub trait Access<T>: Observable {
	/// Current value, revalidating first if needed.
	fn get(&self) -> Result<T>;

	fn subscribe_on_change(&self, subscriber: Arc<dyn Subscriber<T>>) -> Result<Subscription>;
}

/// Type-erased handle to any cell producing `T`.
pub struct Value<T> {
	access: Arc<dyn Access<T>>,
	observable: Arc<dyn Observable>,
}

impl<T> Clone for Value<T> {
	fn clone(&self) -> Self {
		Value {
			access: self.access.clone(),
			observable: self.observable.clone(),
		}
	}
}

impl<T> Value<T>
where
	T: 'static,
{
	pub fn new<A>(body: Arc<A>) -> Self
	where
		A: Access<T>,
	{
		Value {
			access: body.clone(),
			observable: body,
		}
	}

	#[inline]
	pub fn get(&self) -> Result<T> {
		self.access.get()
	}

	pub fn id(&self) -> CellId {
		self.observable.id()
	}

	pub fn is_valid(&self) -> bool {
		self.observable.is_valid()
	}
}

impl<T> Debug for Value<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Value")
			.field("id", &self.observable.id())
			.field("valid", &self.observable.is_valid())
			.finish()
	}
}

/// Implemented by every cell handle so it can act as a parent, be erased
/// into a [`Value`], or start a [`Pipe`].
pub trait Signal<T>
where
	T: Send + Sync + 'static,
{
	fn observable(&self) -> Arc<dyn Observable>;

	fn value(&self) -> Value<T>;

	fn pipe(&self) -> Pipe<T>
	where
		Self: Sized,
	{
		Pipe::new(self)
	}

	fn subscribe_on_change(
		&self,
		listener: impl Fn(&T) + Send + Sync + 'static,
	) -> Result<Subscription>
	where
		Self: Sized,
	{
		self.value()
			.access
			.subscribe_on_change(Arc::new(FnSubscriber::new(listener)))
	}

	fn subscribe_on_invalidate(
		&self,
		listener: impl Fn() + Send + Sync + 'static,
	) -> Result<Subscription>
	where
		Self: Sized,
	{
		self.observable()
			.subscribe_on_invalidate(Arc::new(FnSubscriber::new(move |_: &()| listener())))
	}
}

impl<T> Signal<T> for Value<T>
where
	T: Send + Sync + 'static,
{
	fn observable(&self) -> Arc<dyn Observable> {
		self.observable.clone()
	}

	fn value(&self) -> Value<T> {
		self.clone()
	}
}
