//! Fluent combinator chains that freeze into a [`Computed`] cell.
//!
//! An exclusive pipe is one mutable object: every combinator rewrites its
//! recipe in place and hands back the same pipe. A shared pipe is a template:
//! every combinator branches off a new pipe and leaves the original untouched.
//! Steps that change the value type always produce a new pipe, keeping the
//! mode of their source.
//!
//! A pipe stores a recipe rather than a generator. Every build runs the recipe
//! once, so stateful steps such as `filter` and `reduce` start fresh in each
//! built cell.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::computed::{Computed, Generator};
use crate::error::{Error, Result};
use crate::numeric::Numeric;
use crate::options::Options;
use crate::value::Signal;
use crate::Observable;

/// Produces a new generator chain, with new step state, on every call.
type Recipe<T> = Arc<dyn Fn() -> Generator<T> + Send + Sync>;

pub struct Pipe<T: 'static> {
	body: Arc<PipeBody<T>>,
}

struct PipeBody<T: 'static> {
	parents: Arc<[Arc<dyn Observable>]>,
	shared: bool,
	recipe: Mutex<Recipe<T>>,
}

impl<T> Clone for Pipe<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> Pipe<T>
where
	T: Send + Sync + 'static,
{
	/// An exclusive pipe whose first step reads `root`.
	pub fn new(root: &impl Signal<T>) -> Self {
		let value = root.value();
		Pipe::from_parts(
			Arc::from(vec![root.observable()]),
			Arc::new(move || -> Generator<T> {
				let value = value.clone();
				Arc::new(move || value.get())
			}),
			false,
		)
	}

	fn from_parts(parents: Arc<[Arc<dyn Observable>]>, recipe: Recipe<T>, shared: bool) -> Self {
		Pipe {
			body: Arc::new(PipeBody {
				parents,
				shared,
				recipe: Mutex::new(recipe),
			}),
		}
	}

	fn chain(&self, step: impl Fn(Generator<T>) -> Generator<T> + Send + Sync + 'static) -> Pipe<T> {
		let mut recipe = self.body.recipe.lock();
		let upstream = recipe.clone();
		let next: Recipe<T> = Arc::new(move || step(upstream()));
		if self.body.shared {
			Pipe::from_parts(self.body.parents.clone(), next, true)
		} else {
			*recipe = next;
			self.clone()
		}
	}

	fn fork<U>(&self, step: impl Fn(Generator<T>) -> Generator<U> + Send + Sync + 'static) -> Pipe<U>
	where
		U: Send + Sync + 'static,
	{
		let upstream = self.body.recipe.lock().clone();
		Pipe::from_parts(
			self.body.parents.clone(),
			Arc::new(move || step(upstream())),
			self.body.shared,
		)
	}

	fn with_mode(&self, shared: bool) -> Pipe<T> {
		let recipe = self.body.recipe.lock().clone();
		Pipe::from_parts(self.body.parents.clone(), recipe, shared)
	}

	pub fn is_shared(&self) -> bool {
		self.body.shared
	}

	pub fn parents(&self) -> &[Arc<dyn Observable>] {
		&self.body.parents
	}

	/// This pipe as a reusable template. Copies only when the mode changes.
	pub fn shared(&self) -> Pipe<T> {
		if self.body.shared {
			return self.clone();
		}
		self.with_mode(true)
	}

	/// This pipe as a linear chain. Copies only when the mode changes.
	pub fn exclusive(&self) -> Pipe<T> {
		if !self.body.shared {
			return self.clone();
		}
		self.with_mode(false)
	}

	/// Same-type transformation.
	pub fn unary(&self, op: impl Fn(T) -> T + Send + Sync + 'static) -> Pipe<T> {
		let op = Arc::new(op);
		self.chain(move |upstream| {
			let op = op.clone();
			Arc::new(move || upstream().map(|v| op(v)))
		})
	}

	pub fn map<U>(&self, func: impl Fn(T) -> U + Send + Sync + 'static) -> Pipe<U>
	where
		U: Send + Sync + 'static,
	{
		let func = Arc::new(func);
		self.fork(move |upstream| {
			let func = func.clone();
			Arc::new(move || upstream().map(|v| func(v)))
		})
	}

	/// A step that may fail. The error reaches the reader unchanged.
	pub fn try_map<U>(&self, func: impl Fn(T) -> Result<U> + Send + Sync + 'static) -> Pipe<U>
	where
		U: Send + Sync + 'static,
	{
		let func = Arc::new(func);
		self.fork(move |upstream| {
			let func = func.clone();
			Arc::new(move || upstream().and_then(|v| func(v)))
		})
	}

	pub fn map_to_object<U>(&self, func: impl Fn(T) -> U + Send + Sync + 'static) -> Pipe<U>
	where
		U: Send + Sync + 'static,
	{
		self.map(func)
	}

	pub fn map_to_number<N>(&self, func: impl Fn(T) -> N + Send + Sync + 'static) -> Pipe<N>
	where
		N: Numeric,
	{
		self.map(func)
	}

	pub fn map_to_int(&self, func: impl Fn(T) -> i32 + Send + Sync + 'static) -> Pipe<i32> {
		self.map(func)
	}

	pub fn map_to_long(&self, func: impl Fn(T) -> i64 + Send + Sync + 'static) -> Pipe<i64> {
		self.map(func)
	}

	pub fn map_to_double(&self, func: impl Fn(T) -> f64 + Send + Sync + 'static) -> Pipe<f64> {
		self.map(func)
	}

	/// Observes every value pulled through this step.
	pub fn peek(&self, action: impl Fn(&T) + Send + Sync + 'static) -> Pipe<T> {
		let action = Arc::new(action);
		self.chain(move |upstream| {
			let action = action.clone();
			Arc::new(move || {
				let value = upstream()?;
				action(&value);
				Ok(value)
			})
		})
	}

	/// Passes values matching `predicate`; for any other value it repeats the
	/// last one that matched. Until something matches, reads fail with
	/// [`Error::Empty`].
	pub fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Pipe<T>
	where
		T: Clone,
	{
		let predicate = Arc::new(predicate);
		self.chain(move |upstream| {
			let predicate = predicate.clone();
			let last = Mutex::new(None::<T>);
			Arc::new(move || {
				let value = upstream()?;
				let mut last = last.lock();
				if predicate(&value) {
					*last = Some(value.clone());
					Ok(value)
				} else {
					last.clone().ok_or(Error::Empty)
				}
			})
		})
	}

	/// Folds every pulled value into an accumulator that starts at `seed`.
	pub fn reduce(&self, seed: T, op: impl Fn(T, T) -> T + Send + Sync + 'static) -> Pipe<T>
	where
		T: Clone,
	{
		self.reduce_with(move || seed.clone(), op)
	}

	/// Like [`Pipe::reduce`], asking `seed` for the starting accumulator on the
	/// first pull of each built cell.
	pub fn reduce_with(
		&self,
		seed: impl Fn() -> T + Send + Sync + 'static,
		op: impl Fn(T, T) -> T + Send + Sync + 'static,
	) -> Pipe<T>
	where
		T: Clone,
	{
		let (seed, op) = (Arc::new(seed), Arc::new(op));
		self.chain(move |upstream| {
			let (seed, op) = (seed.clone(), op.clone());
			let accumulator = Mutex::new(None::<T>);
			Arc::new(move || {
				let value = upstream()?;
				let mut accumulator = accumulator.lock();
				let current = accumulator.take().unwrap_or_else(|| seed());
				let next = op(current, value);
				*accumulator = Some(next.clone());
				Ok(next)
			})
		})
	}

	pub fn build(&self) -> Result<Computed<T>>
	where
		T: Clone + PartialEq,
	{
		self.build_with(Options::default())
	}

	pub fn build_with(&self, options: Options<T>) -> Result<Computed<T>>
	where
		T: Clone,
	{
		let recipe = self.body.recipe.lock().clone();
		Computed::from_generator(self.body.parents.to_vec(), recipe(), options)
	}
}

impl<T> Pipe<T>
where
	T: Numeric,
{
	pub fn build_int(&self) -> Result<Computed<i32>> {
		self.map_to_int(T::to_i32).build()
	}

	pub fn build_long(&self) -> Result<Computed<i64>> {
		self.map_to_long(T::to_i64).build()
	}

	pub fn build_double(&self) -> Result<Computed<f64>> {
		self.map_to_double(T::to_f64).build()
	}
}

impl<T> Debug for Pipe<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Pipe")
			.field("parents", &self.body.parents.len())
			.field("shared", &self.body.shared)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Var;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[test]
	fn exclusive_combinators_mutate_in_place() {
		let a = Var::new(2);
		let pipe = a.pipe();
		let same = pipe.unary(|v| v + 1);

		assert!(Arc::ptr_eq(&pipe.body, &same.body));
		assert_eq!(pipe.build().unwrap().get().unwrap(), 3);
	}

	#[test]
	fn shared_combinators_branch() {
		let a = Var::new(2);
		let template = a.pipe().shared();
		let plus = template.unary(|v| v + 1);
		let times = template.unary(|v| v * 10);

		assert!(!Arc::ptr_eq(&template.body, &plus.body));
		assert_eq!(template.build().unwrap().get().unwrap(), 2);
		assert_eq!(plus.build().unwrap().get().unwrap(), 3);
		assert_eq!(times.build().unwrap().get().unwrap(), 20);
	}

	#[test]
	fn mode_switch_copies_only_on_change() {
		let a = Var::new(1);
		let exclusive = a.pipe();
		assert!(!exclusive.is_shared());
		assert!(Arc::ptr_eq(&exclusive.body, &exclusive.exclusive().body));

		let shared = exclusive.shared();
		assert!(shared.is_shared());
		assert!(!Arc::ptr_eq(&exclusive.body, &shared.body));
		assert!(Arc::ptr_eq(&shared.body, &shared.shared().body));
	}

	#[test]
	fn type_changing_steps_keep_the_mode() {
		let a = Var::new(3);
		let text = a.pipe().shared().map(|v| format!("#{v}"));

		assert!(text.is_shared());
		assert_eq!(text.build().unwrap().get().unwrap(), "#3");
	}

	#[test]
	fn filter_retains_last_accepted_value() {
		let a = Var::new(-3);
		let positive = a.pipe().filter(|v| *v > 0).build().unwrap();

		assert!(matches!(positive.get(), Err(Error::Empty)));

		a.set(5);
		assert_eq!(positive.get().unwrap(), 5);
		a.set(-1);
		assert_eq!(positive.get().unwrap(), 5);
		a.set(7);
		assert_eq!(positive.get().unwrap(), 7);
	}

	#[test]
	fn reduce_folds_each_pull() {
		let a = Var::new(1);
		let total = a.pipe().reduce(0, |acc, v| acc + v).build().unwrap();

		assert_eq!(total.get().unwrap(), 1);
		// cached, no pull
		assert_eq!(total.get().unwrap(), 1);

		a.set(2);
		assert_eq!(total.get().unwrap(), 3);
		a.set(10);
		assert_eq!(total.get().unwrap(), 13);
	}

	#[test]
	fn template_branches_fold_independently() {
		let a = Var::new(1);
		let template = a.pipe().reduce(0, |acc, v| acc + v).shared();
		let x = template.unary(|v| v).build().unwrap();
		let y = template.unary(|v| v).build().unwrap();

		assert_eq!(x.get().unwrap(), 1);
		assert_eq!(y.get().unwrap(), 1);

		a.set(2);
		assert_eq!(x.get().unwrap(), 3);
		assert_eq!(y.get().unwrap(), 3);
	}

	#[test]
	fn each_build_gets_its_own_filter_state() {
		let a = Var::new(4);
		let pipe = a.pipe().filter(|v| v % 2 == 0);
		let early = pipe.build().unwrap();
		assert_eq!(early.get().unwrap(), 4);

		a.set(3);
		let late = pipe.build().unwrap();
		assert_eq!(early.get().unwrap(), 4);
		assert!(matches!(late.get(), Err(Error::Empty)));
	}

	#[test]
	fn reduce_with_asks_seed_once() {
		let a = Var::new(1);
		let seeds = Arc::new(AtomicUsize::new(0));
		let total = {
			let seeds = seeds.clone();
			a.pipe()
				.reduce_with(
					move || {
						seeds.fetch_add(1, Ordering::SeqCst);
						100
					},
					|acc, v| acc - v,
				)
				.build()
				.unwrap()
		};

		assert_eq!(total.get().unwrap(), 99);
		a.set(4);
		assert_eq!(total.get().unwrap(), 95);
		assert_eq!(seeds.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn peek_sees_pulled_values() {
		let a = Var::new(1);
		let seen = Arc::new(Mutex::new(Vec::new()));
		let cell = {
			let seen = seen.clone();
			a.pipe()
				.peek(move |v| seen.lock().push(*v))
				.unary(|v| v * 2)
				.build()
				.unwrap()
		};

		assert_eq!(cell.get().unwrap(), 2);
		a.set(3);
		assert_eq!(cell.get().unwrap(), 6);
		assert_eq!(*seen.lock(), vec![1, 3]);
	}

	#[test]
	fn failure_surfaces_once_at_the_read() {
		let a = Var::new(0);
		let cell = a
			.pipe()
			.try_map(|v| match v {
				0 => Err(Error::generator("zero")),
				v => Ok(10 / v),
			})
			.map(|v| v + 1)
			.build()
			.unwrap();

		let err = cell.get().unwrap_err();
		assert_eq!(err.to_string(), "generator failed: zero");

		a.set(5);
		assert_eq!(cell.get().unwrap(), 3);
	}

	#[test]
	fn numeric_builds_convert() {
		let a = Var::new(2.6);
		let pipe = a.pipe().unary(|v| v * 2.0);

		assert_eq!(pipe.build_int().unwrap().get().unwrap(), 5);
		assert_eq!(pipe.build_long().unwrap().get().unwrap(), 5);
		assert_eq!(pipe.build_double().unwrap().get().unwrap(), 5.2);
	}

	#[test]
	fn map_to_variants_change_the_type() {
		let a = Var::new(7);
		let half = a.pipe().shared().map_to_double(|v| v as f64 / 2.0);
		let wide = a.pipe().map_to_long(|v| v as i64 * 1_000_000_000);
		let back = half.map_to_int(|v| v.round() as i32);
		let num = a.pipe().map_to_number(|v| v as f64);
		let boxed = a.pipe().map_to_object(|v| vec![v; 2]);

		assert_eq!(half.build().unwrap().get().unwrap(), 3.5);
		assert_eq!(wide.build().unwrap().get().unwrap(), 7_000_000_000);
		assert_eq!(back.build().unwrap().get().unwrap(), 4);
		assert_eq!(num.build().unwrap().get_double().unwrap(), 7.0);
		assert_eq!(boxed.build().unwrap().get().unwrap(), vec![7, 7]);
	}

	#[test]
	fn built_cell_tracks_root_parent() {
		let a = Var::new(1);
		let cell = a.pipe().unary(|v| v + 1).build().unwrap();

		assert_eq!(cell.parents().len(), 1);
		assert_eq!(cell.parents()[0].id(), a.id());
		assert_eq!(a.invalidation_subscribers(), 1);
	}
}
