use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Orders and compares an `Arc` by the address it points to.
pub struct ArcAddr<T: ?Sized> {
	ptr: Arc<T>,
}

impl<T: ?Sized> ArcAddr<T> {
	pub fn new(ptr: Arc<T>) -> Self {
		ArcAddr { ptr }
	}
}

impl<T: ?Sized> PartialEq for ArcAddr<T> {
	fn eq(&self, other: &Self) -> bool {
		std::ptr::addr_eq(Arc::as_ptr(&self.ptr), Arc::as_ptr(&other.ptr))
	}
}

impl<T: ?Sized> Eq for ArcAddr<T> {}

impl<T: ?Sized> Ord for ArcAddr<T> {
	fn cmp(&self, other: &Self) -> Ordering {
		Arc::as_ptr(&self.ptr)
			.cast::<()>()
			.cmp(&Arc::as_ptr(&other.ptr).cast::<()>())
	}
}

impl<T: ?Sized> PartialOrd for ArcAddr<T> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// Drops repeated entries, keeping the first occurrence of each.
pub fn dedup<T: ?Sized>(items: Vec<Arc<T>>) -> Vec<Arc<T>> {
	let mut seen = BTreeSet::new();
	items
		.into_iter()
		.filter(|item| seen.insert(ArcAddr::new(item.clone())))
		.collect()
}
