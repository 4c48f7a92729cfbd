use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Decides whether a write actually changed a cell. When it returns `true`
/// for the old and new value, no notification is sent.
pub struct Comparator<T> {
	same: Arc<dyn Fn(&T, &T) -> bool + Send + Sync>,
	kind: &'static str,
}

impl<T> Clone for Comparator<T> {
	fn clone(&self) -> Self {
		Comparator {
			same: self.same.clone(),
			kind: self.kind,
		}
	}
}

/// Values that have a notion of reference identity.
pub trait Identity {
	fn same_instance(&self, other: &Self) -> bool;
}

impl<U: ?Sized> Identity for Arc<U> {
	fn same_instance(&self, other: &Self) -> bool {
		Arc::ptr_eq(self, other)
	}
}

impl<U: ?Sized> Identity for &'static U {
	fn same_instance(&self, other: &Self) -> bool {
		std::ptr::addr_eq(*self as *const U, *other as *const U)
	}
}

impl<T: 'static> Comparator<T> {
	/// `PartialEq`. Floats follow IEEE rules, so writing `NaN` always notifies.
	pub fn value() -> Self
	where
		T: PartialEq,
	{
		Comparator {
			same: Arc::new(|a: &T, b: &T| a == b),
			kind: "value",
		}
	}

	/// Same instance rather than equal contents.
	pub fn identity() -> Self
	where
		T: Identity,
	{
		Comparator {
			same: Arc::new(|a: &T, b: &T| a.same_instance(b)),
			kind: "identity",
		}
	}

	/// Compares 64-bit fxhash digests. Cheap for large values, with the usual
	/// collision caveat.
	pub fn hashed() -> Self
	where
		T: Hash,
	{
		Comparator {
			same: Arc::new(|a: &T, b: &T| fxhash::hash64(a) == fxhash::hash64(b)),
			kind: "hashed",
		}
	}

	/// Every write counts as a change.
	pub fn never() -> Self {
		Comparator {
			same: Arc::new(|_: &T, _: &T| false),
			kind: "never",
		}
	}

	pub fn custom(same: impl Fn(&T, &T) -> bool + Send + Sync + 'static) -> Self {
		Comparator {
			same: Arc::new(same),
			kind: "custom",
		}
	}
}

impl<T> Comparator<T> {
	#[inline]
	pub fn same(&self, old: &T, new: &T) -> bool {
		(self.same)(old, new)
	}

	#[inline]
	pub fn changed(&self, old: &T, new: &T) -> bool {
		!self.same(old, new)
	}
}

impl<T: PartialEq + 'static> Default for Comparator<T> {
	fn default() -> Self {
		Comparator::value()
	}
}

impl<T> Debug for Comparator<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("Comparator").field(&self.kind).finish()
	}
}
