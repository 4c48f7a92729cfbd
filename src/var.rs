use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::channel::{Subscriber, Subscription};
use crate::comparator::Comparator;
use crate::error::Result;
use crate::numeric::Numeric;
use crate::observers::Observers;
use crate::options::{Executor, Options};
use crate::value::{Access, Signal, Value};
use crate::{CellId, Observable};

pub type IntVar = Var<i32>;
pub type LongVar = Var<i64>;
pub type DoubleVar = Var<f64>;
pub type BoolVar = Var<bool>;

/// A cell written directly from the outside. Always valid.
pub struct Var<T: 'static> {
	body: Arc<VarBody<T>>,
}

pub struct VarBody<T: 'static> {
	id: CellId,
	name: Option<&'static str>,
	value: RwLock<T>,
	observers: Observers<T>,
	comparator: Comparator<T>,
	executor: Option<Arc<dyn Executor>>,
}

impl<T> Clone for Var<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> Default for Var<T>
where
	T: Default + Clone + PartialEq + Send + Sync + 'static,
{
	fn default() -> Self {
		Var::new(Default::default())
	}
}

pub trait Toggle {
	fn toggle(&mut self);
}

impl Toggle for bool {
	fn toggle(&mut self) {
		*self = !*self
	}
}

impl<T> Var<T>
where
	T: Clone + Send + Sync + 'static,
{
	pub fn new(value: T) -> Self
	where
		T: PartialEq,
	{
		Self::with_options(value, Options::default())
	}

	pub fn with_options(value: T, options: Options<T>) -> Self {
		Var {
			body: Arc::new(VarBody {
				id: CellId::next(),
				name: options.name,
				value: RwLock::new(value),
				observers: Observers::new(),
				comparator: options.comparator,
				executor: options.executor,
			}),
		}
	}

	pub fn id(&self) -> CellId {
		self.body.id
	}

	pub fn name(&self) -> Option<&'static str> {
		self.body.name
	}

	#[inline]
	pub fn get(&self) -> T {
		self.body.value.read().clone()
	}

	/// Borrows the current value. Writers block until the guard is dropped.
	#[inline]
	pub fn get_ref(&self) -> RwLockReadGuard<'_, T> {
		self.body.value.read()
	}

	/// Stores `value` and, if the comparator reports a change, fires
	/// invalidation followed by change. Returns whether it changed.
	#[inline]
	pub fn set(&self, value: T) -> bool {
		self.body.replace(value).1
	}

	#[inline]
	pub fn replace(&self, value: T) -> T {
		self.body.replace(value).0
	}

	#[inline]
	pub fn update(&self, func: impl FnOnce(&mut T)) -> bool {
		self.body.update(func)
	}

	#[inline]
	pub fn toggle(&self) -> bool
	where
		T: Toggle,
	{
		self.update(T::toggle)
	}

	pub fn executor(&self) -> Option<&Arc<dyn Executor>> {
		self.body.executor.as_ref()
	}

	pub fn change_subscribers(&self) -> usize {
		self.body.observers.change_subscribers()
	}

	pub fn invalidation_subscribers(&self) -> usize {
		self.body.observers.invalidation_subscribers()
	}

	/// Closes both notification channels. The value can still be written,
	/// nobody hears about it.
	pub fn close(&self) {
		tracing::trace!(cell = %self.body.id, name = ?self.body.name, "closing var");
		self.body.observers.close();
	}

	pub fn is_closed(&self) -> bool {
		self.body.observers.is_closed()
	}
}

impl<T> Var<T>
where
	T: Numeric,
{
	pub fn set_int(&self, value: i32) -> bool {
		self.set(T::from_i32(value))
	}

	pub fn set_long(&self, value: i64) -> bool {
		self.set(T::from_i64(value))
	}

	pub fn set_double(&self, value: f64) -> bool {
		self.set(T::from_f64(value))
	}

	pub fn get_int(&self) -> i32 {
		self.get().to_i32()
	}

	pub fn get_long(&self) -> i64 {
		self.get().to_i64()
	}

	pub fn get_double(&self) -> f64 {
		self.get().to_f64()
	}
}

impl<T> VarBody<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn replace(&self, value: T) -> (T, bool) {
		let (old, changed) = {
			let mut current = self.value.write();
			let changed = self.comparator.changed(&current, &value);
			(std::mem::replace(&mut *current, value.clone()), changed)
		};

		if changed {
			self.notify(&value);
		}

		(old, changed)
	}

	fn update(&self, func: impl FnOnce(&mut T)) -> bool {
		let next = {
			let mut current = self.value.write();
			let old = current.clone();
			func(&mut current);
			self.comparator
				.changed(&old, &current)
				.then(|| current.clone())
		};

		match next {
			Some(value) => {
				self.notify(&value);
				true
			}
			None => false,
		}
	}

	fn notify(&self, value: &T) {
		tracing::trace!(cell = %self.id, name = ?self.name, "var changed");
		self.observers.fire_invalidation();
		self.observers.fire_change(value);
	}
}

impl<T> Observable for VarBody<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn id(&self) -> CellId {
		self.id
	}

	fn is_valid(&self) -> bool {
		true
	}

	fn subscribe_on_invalidate(&self, subscriber: Arc<dyn Subscriber<()>>) -> Result<Subscription> {
		self.observers.subscribe_on_invalidate(subscriber)
	}

	fn invalidation_subscribers(&self) -> usize {
		self.observers.invalidation_subscribers()
	}

	fn change_subscribers(&self) -> usize {
		self.observers.change_subscribers()
	}

	fn close(&self) {
		self.observers.close()
	}
}

impl<T> Access<T> for VarBody<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn get(&self) -> Result<T> {
		Ok(self.value.read().clone())
	}

	fn subscribe_on_change(&self, subscriber: Arc<dyn Subscriber<T>>) -> Result<Subscription> {
		self.observers.subscribe_on_change(subscriber)
	}
}

impl<T> Signal<T> for Var<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn observable(&self) -> Arc<dyn Observable> {
		self.body.clone()
	}

	fn value(&self) -> Value<T> {
		Value::new(self.body.clone())
	}
}

impl<T> From<Var<T>> for Value<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn from(var: Var<T>) -> Self {
		Value::new(var.body)
	}
}

impl<T> Debug for Var<T>
where
	T: Debug + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Var")
			.field("id", &self.body.id)
			.field("name", &self.body.name)
			.field("value", &*self.body.value.read())
			.finish()
	}
}
