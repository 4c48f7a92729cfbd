use std::fmt::Debug;
use std::sync::Arc;

use crate::comparator::Comparator;

/// Somewhere to run work. Cells only carry it around for their owners;
/// evaluation and notification always happen inline on the calling thread.
pub trait Executor: Send + Sync {
	fn execute(&self, task: Box<dyn FnOnce() + Send>);
}

/// Runs the task immediately on the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inline;

impl Executor for Inline {
	fn execute(&self, task: Box<dyn FnOnce() + Send>) {
		task()
	}
}

/// Per-cell configuration.
pub struct Options<T> {
	pub(crate) name: Option<&'static str>,
	pub(crate) comparator: Comparator<T>,
	pub(crate) executor: Option<Arc<dyn Executor>>,
}

impl<T> Clone for Options<T> {
	fn clone(&self) -> Self {
		Options {
			name: self.name,
			comparator: self.comparator.clone(),
			executor: self.executor.clone(),
		}
	}
}

impl<T: PartialEq + 'static> Default for Options<T> {
	fn default() -> Self {
		Options::with_comparator(Comparator::value())
	}
}

impl<T: 'static> Options<T> {
	/// Starting point for value types without `PartialEq`.
	pub fn with_comparator(comparator: Comparator<T>) -> Self {
		Options {
			name: None,
			comparator,
			executor: None,
		}
	}

	#[must_use]
	pub fn name(mut self, name: &'static str) -> Self {
		self.name = Some(name);
		self
	}

	#[must_use]
	pub fn comparator(mut self, comparator: Comparator<T>) -> Self {
		self.comparator = comparator;
		self
	}

	#[must_use]
	pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
		self.executor = Some(executor);
		self
	}
}

impl<T> Debug for Options<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Options")
			.field("name", &self.name)
			.field("comparator", &self.comparator)
			.field("executor", &self.executor.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicBool, Ordering};

	#[test]
	fn inline_runs_immediately() {
		let ran = Arc::new(AtomicBool::new(false));
		let flag = ran.clone();
		Inline.execute(Box::new(move || flag.store(true, Ordering::SeqCst)));
		assert!(ran.load(Ordering::SeqCst));
	}

	#[test]
	fn builder_sets_fields() {
		let options = Options::<i32>::default()
			.name("counter")
			.comparator(Comparator::never())
			.executor(Arc::new(Inline));

		assert_eq!(options.name, Some("counter"));
		assert!(options.comparator.changed(&1, &1));
		assert!(options.executor.is_some());
	}
}
