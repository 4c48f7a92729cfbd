pub use enclose::*;

/// Builds a [`Computed`](crate::Computed) from the listed cells.
///
/// Each named handle is cloned into the generator and registered as a parent.
/// The body must evaluate to a `cellflow::Result`.
///
/// ```
/// use cellflow::{computed, Var};
///
/// let a = Var::new(2);
/// let b = Var::new(3);
/// let sum = computed!((a, b) => Ok(a.get() + b.get())).unwrap();
/// assert_eq!(sum.get().unwrap(), 5);
/// ```
#[macro_export]
macro_rules! computed {
	(( $($parent:ident),+ $(,)? ) => $($body:tt)+) => {
		$crate::Computed::new(
			::std::vec![$( $crate::Signal::observable(&$parent) ),+],
			$crate::macros::enclose!(($( $parent ),+) move || { $($body)+ }),
		)
	};
}
