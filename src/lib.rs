//! Reactive cells with change and invalidation notification.
//!
//! A [`Var`] holds state that is written from the outside. A [`Computed`]
//! derives its value from a fixed list of parent cells through a generator and
//! caches the result. Writing a `Var` invalidates every dependent cell; a
//! dependent with change listeners recomputes right away, any other dependent
//! waits for the next read. Reads never return stale values.
//!
//! ```
//! use cellflow::{int_var, Computed, Signal};
//!
//! let a = int_var(2);
//! let b = int_var(3);
//! let sum = Computed::combine(&a, &b, |x, y| x + y).unwrap();
//! assert_eq!(sum.get().unwrap(), 5);
//!
//! a.set(10);
//! assert_eq!(sum.get().unwrap(), 13);
//!
//! let positive = a.pipe().filter(|v| *v > 0).build().unwrap();
//! assert_eq!(positive.get().unwrap(), 10);
//! a.set(-1);
//! assert_eq!(positive.get().unwrap(), 10);
//! ```

pub mod macros;

mod addr;
mod channel;
mod comparator;
mod computed;
mod error;
mod numeric;
mod observers;
mod options;
mod pipe;
mod value;
mod var;

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use channel::{Channel, Flow, FnSubscriber, Subscriber, Subscription};
pub use comparator::{Comparator, Identity};
pub use computed::{Computed, ComputedBody, Generator};
pub use error::{Error, Result};
pub use numeric::Numeric;
pub use observers::Observers;
pub use options::{Executor, Inline, Options};
pub use pipe::Pipe;
pub use value::{Access, Signal, Value};
pub use var::{BoolVar, DoubleVar, IntVar, LongVar, Toggle, Var, VarBody};

/// Untyped side of a cell: identity, validity and the invalidation channel.
pub trait Observable: Send + Sync + 'static {
	fn id(&self) -> CellId;

	fn is_valid(&self) -> bool;

	fn subscribe_on_invalidate(&self, subscriber: Arc<dyn Subscriber<()>>) -> Result<Subscription>;

	fn invalidation_subscribers(&self) -> usize;

	fn change_subscribers(&self) -> usize;

	fn close(&self);
}

/// A cell that has to hear about invalidation of its parents.
pub trait Derived: Send + Sync + 'static {
	fn invalidate(self: Arc<Self>);
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
	Valid,
	Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(u64);

impl CellId {
	pub(crate) fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(0);
		CellId(COUNTER.fetch_add(1, Ordering::Relaxed))
	}

	pub fn raw(self) -> u64 {
		self.0
	}
}

impl Display for CellId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{}", self.0)
	}
}

pub fn var<T>(value: T) -> Var<T>
where
	T: Clone + PartialEq + Send + Sync + 'static,
{
	Var::new(value)
}

pub fn int_var(value: i32) -> IntVar {
	Var::new(value)
}

pub fn long_var(value: i64) -> LongVar {
	Var::new(value)
}

pub fn double_var(value: f64) -> DoubleVar {
	Var::new(value)
}

pub fn bool_var(value: bool) -> BoolVar {
	Var::new(value)
}

/// Starts a combinator chain rooted at any existing cell.
pub fn pipe<T>(root: &impl Signal<T>) -> Pipe<T>
where
	T: Send + Sync + 'static,
{
	Pipe::new(root)
}
