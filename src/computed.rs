use std::cell::RefCell;
use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use crate::addr;
use crate::channel::{Flow, Subscriber, Subscription};
use crate::comparator::Comparator;
use crate::error::{Error, Result};
use crate::numeric::Numeric;
use crate::observers::Observers;
use crate::options::{Executor, Options};
use crate::value::{Access, Signal, Value};
use crate::{CellId, Derived, Observable, State};

pub type Generator<T> = Arc<dyn Fn() -> Result<T> + Send + Sync>;

/// Generator runs per read before a cell that keeps being invalidated by its
/// own generator gives up on committing.
const MAX_PASSES: usize = 8;

/// A cell whose value is produced by a generator over a fixed set of parents.
///
/// Starts out invalid. Any read of an invalid cell runs the generator first.
/// When a parent is invalidated the cell turns invalid, passes the
/// invalidation on (if it was valid) and recomputes straight away when
/// someone listens for its changes.
pub struct Computed<T: 'static> {
	body: Arc<ComputedBody<T>>,
}

impl<T> Clone for Computed<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

pub struct ComputedBody<T: 'static> {
	id: CellId,
	name: Option<&'static str>,
	inner: ReentrantMutex<RefCell<ComputedInner<T>>>,
	generator: Generator<T>,
	comparator: Comparator<T>,
	observers: Observers<T>,
	parents: Vec<Arc<dyn Observable>>,
	links: Mutex<Vec<Subscription>>,
	executor: Option<Arc<dyn Executor>>,
}

struct ComputedInner<T> {
	state: State,
	value: Option<T>,
	/// Bumped by every invalidation. A generator result is committed only if
	/// no invalidation arrived while it ran.
	generation: u64,
}

/// Subscribed on each parent's invalidation channel. Holds the child weakly
/// and cancels itself once the child is gone.
struct ParentLink {
	target: Weak<dyn Derived>,
	child: CellId,
}

impl Subscriber<()> for ParentLink {
	fn on_next(&self, _: &()) -> Flow {
		match self.target.upgrade() {
			Some(target) => {
				target.invalidate();
				Flow::Continue
			}
			None => {
				tracing::debug!(cell = %self.child, "parent link outlived its cell");
				Flow::Cancel
			}
		}
	}
}

impl<T> Computed<T>
where
	T: Clone + Send + Sync + 'static,
{
	pub fn new(
		parents: Vec<Arc<dyn Observable>>,
		generator: impl Fn() -> Result<T> + Send + Sync + 'static,
	) -> Result<Self>
	where
		T: PartialEq,
	{
		Self::with_options(parents, generator, Options::default())
	}

	pub fn with_options(
		parents: Vec<Arc<dyn Observable>>,
		generator: impl Fn() -> Result<T> + Send + Sync + 'static,
		options: Options<T>,
	) -> Result<Self> {
		Self::from_generator(parents, Arc::new(generator), options)
	}

	/// Wires the cell to every parent. Fails with [`Error::NoParents`] for an
	/// empty list and with [`Error::Closed`] if a parent no longer accepts
	/// subscribers; links made before the failure are released.
	pub fn from_generator(
		parents: Vec<Arc<dyn Observable>>,
		generator: Generator<T>,
		options: Options<T>,
	) -> Result<Self> {
		if parents.is_empty() {
			return Err(Error::NoParents);
		}

		let parents = addr::dedup(parents);
		let body = Arc::new(ComputedBody {
			id: CellId::next(),
			name: options.name,
			inner: ReentrantMutex::new(RefCell::new(ComputedInner {
				state: State::Invalid,
				value: None,
				generation: 0,
			})),
			generator,
			comparator: options.comparator,
			observers: Observers::new(),
			links: Mutex::new(Vec::with_capacity(parents.len())),
			parents,
			executor: options.executor,
		});

		let target = Arc::downgrade(&body) as Weak<dyn Derived>;
		for parent in &body.parents {
			let link = parent.subscribe_on_invalidate(Arc::new(ParentLink {
				target: target.clone(),
				child: body.id,
			}))?;
			body.links.lock().push(link);
		}

		Ok(Computed { body })
	}

	pub fn map<A>(parent: &impl Signal<A>, func: impl Fn(A) -> T + Send + Sync + 'static) -> Result<Self>
	where
		A: Send + Sync + 'static,
		T: PartialEq,
	{
		let a = parent.value();
		Self::new(vec![parent.observable()], move || Ok(func(a.get()?)))
	}

	pub fn combine<A, B>(
		first: &impl Signal<A>,
		second: &impl Signal<B>,
		func: impl Fn(A, B) -> T + Send + Sync + 'static,
	) -> Result<Self>
	where
		A: Send + Sync + 'static,
		B: Send + Sync + 'static,
		T: PartialEq,
	{
		let a = first.value();
		let b = second.value();
		Self::new(vec![first.observable(), second.observable()], move || {
			Ok(func(a.get()?, b.get()?))
		})
	}

	pub fn id(&self) -> CellId {
		self.body.id
	}

	pub fn name(&self) -> Option<&'static str> {
		self.body.name
	}

	#[inline]
	pub fn get(&self) -> Result<T> {
		self.body.revalidate()
	}

	/// Runs the generator if the cell is invalid. A no-op on a valid cell.
	pub fn revalidate(&self) -> Result<T> {
		self.body.revalidate()
	}

	pub fn state(&self) -> State {
		self.body.state()
	}

	pub fn is_valid(&self) -> bool {
		self.body.state() == State::Valid
	}

	pub fn parents(&self) -> &[Arc<dyn Observable>] {
		&self.body.parents
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

	pub fn close(&self) {
		tracing::trace!(cell = %self.body.id, name = ?self.body.name, "closing computed");
		self.body.observers.close();
	}

	pub fn is_closed(&self) -> bool {
		self.body.observers.is_closed()
	}
}

impl<T> Computed<T>
where
	T: Numeric,
{
	pub fn get_int(&self) -> Result<i32> {
		self.get().map(T::to_i32)
	}

	pub fn get_long(&self) -> Result<i64> {
		self.get().map(T::to_i64)
	}

	pub fn get_double(&self) -> Result<f64> {
		self.get().map(T::to_f64)
	}
}

impl<T> ComputedBody<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn state(&self) -> State {
		self.inner.lock().borrow().state
	}

	fn revalidate(&self) -> Result<T> {
		let guard = self.inner.lock();
		let mut passes = 0;

		loop {
			let generation = {
				let inner = guard.borrow();
				if let (State::Valid, Some(value)) = (inner.state, inner.value.as_ref()) {
					return Ok(value.clone());
				}
				inner.generation
			};

			tracing::trace!(cell = %self.id, name = ?self.name, "revalidating");

			// The borrow is released while the generator runs, it may re-enter
			// this cell through a parent's change listener.
			let value = (self.generator)()?;
			passes += 1;

			let mut inner = guard.borrow_mut();
			if inner.generation != generation {
				drop(inner);
				if passes < MAX_PASSES {
					tracing::trace!(cell = %self.id, name = ?self.name, "invalidated while computing");
					continue;
				}
				tracing::debug!(
					cell = %self.id,
					name = ?self.name,
					passes,
					"parents keep changing during revalidation, leaving cell invalid"
				);
				return Ok(value);
			}

			let changed = inner
				.value
				.as_ref()
				.map_or(true, |previous| self.comparator.changed(previous, &value));
			inner.value = Some(value.clone());
			inner.state = State::Valid;
			drop(inner);
			drop(guard);

			if changed {
				self.observers.fire_change(&value);
			}

			return Ok(value);
		}
	}
}

impl<T> Derived for ComputedBody<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn invalidate(self: Arc<Self>) {
		let was_valid = {
			let guard = self.inner.lock();
			let mut inner = guard.borrow_mut();
			let was_valid = inner.state == State::Valid;
			inner.state = State::Invalid;
			inner.generation = inner.generation.wrapping_add(1);
			was_valid
		};

		if was_valid {
			tracing::trace!(cell = %self.id, name = ?self.name, "invalidated");
			self.observers.fire_invalidation();
		}

		if self.observers.is_eager_required() {
			if let Err(err) = self.revalidate() {
				tracing::debug!(
					cell = %self.id,
					name = ?self.name,
					error = %err,
					"eager revalidation failed, retrying on next read"
				);
			}
		}
	}
}

impl<T> Observable for ComputedBody<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn id(&self) -> CellId {
		self.id
	}

	fn is_valid(&self) -> bool {
		self.state() == State::Valid
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

impl<T> Access<T> for ComputedBody<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn get(&self) -> Result<T> {
		self.revalidate()
	}

	fn subscribe_on_change(&self, subscriber: Arc<dyn Subscriber<T>>) -> Result<Subscription> {
		self.observers.subscribe_on_change(subscriber)
	}
}

impl<T> Signal<T> for Computed<T>
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

impl<T> From<Computed<T>> for Value<T>
where
	T: Clone + Send + Sync + 'static,
{
	fn from(computed: Computed<T>) -> Self {
		Value::new(computed.body)
	}
}

impl<T> Debug for Computed<T>
where
	T: Debug + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let guard = self.body.inner.lock();
		let inner = guard.borrow();
		f.debug_struct("Computed")
			.field("id", &self.body.id)
			.field("name", &self.body.name)
			.field("state", &inner.state)
			.field("value", &inner.value)
			.finish()
	}
}
