use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use cellflow::{int_var, long_var, Computed, Signal};

const THREADS: usize = 8;
const ROUNDS: i64 = 200;

#[test]
fn readers_and_writers_settle_on_fresh_values() {
	let a = long_var(0);
	let b = long_var(0);
	let sum = Computed::combine(&a, &b, |x, y| x + y).unwrap();
	let doubled = Computed::map(&sum, |v| v * 2).unwrap();
	let _token = doubled.subscribe_on_change(|_: &i64| {}).unwrap();
	let done = AtomicBool::new(false);

	thread::scope(|s| {
		for _ in 0..THREADS / 2 {
			s.spawn(|| {
				while !done.load(Ordering::Relaxed) {
					sum.get().unwrap();
					doubled.get().unwrap();
				}
			});
		}

		let writers: Vec<_> = (0..THREADS / 2)
			.map(|t| {
				let (a, b) = (&a, &b);
				s.spawn(move || {
					for round in 0..ROUNDS {
						if t % 2 == 0 {
							a.set(round * t as i64);
						} else {
							b.update(|v| *v += 1);
						}
					}
				})
			})
			.collect();

		for writer in writers {
			writer.join().unwrap();
		}
		done.store(true, Ordering::Relaxed);
	});

	let expected = a.get() + b.get();
	assert_eq!(sum.get().unwrap(), expected);
	assert_eq!(doubled.get().unwrap(), expected * 2);
}

#[test]
fn exclusive_pipe_collects_steps_from_every_thread() {
	let root = int_var(100);
	let pipe = root.pipe();

	thread::scope(|s| {
		for _ in 0..THREADS {
			s.spawn(|| {
				pipe.unary(|v| v + 1);
			});
		}
	});

	let cell = pipe.build().unwrap();
	assert_eq!(cell.get().unwrap(), 100 + THREADS as i32);
}

#[test]
fn shared_pipe_branches_independently_across_threads() {
	let root = int_var(3);
	let template = root.pipe().shared();

	let results: Vec<i32> = thread::scope(|s| {
		let handles: Vec<_> = (1..=THREADS as i32)
			.map(|factor| {
				let template = &template;
				s.spawn(move || {
					let branch = template.unary(move |v| v * factor).build().unwrap();
					branch.get().unwrap()
				})
			})
			.collect();
		handles.into_iter().map(|h| h.join().unwrap()).collect()
	});

	let expected: Vec<i32> = (1..=THREADS as i32).map(|f| 3 * f).collect();
	assert_eq!(results, expected);
	assert_eq!(template.build().unwrap().get().unwrap(), 3);
}

#[test]
fn listeners_subscribe_and_drop_while_writing() {
	let a = int_var(0);
	let doubled = Computed::map(&a, |v| v * 2).unwrap();

	thread::scope(|s| {
		s.spawn(|| {
			for v in 1..=ROUNDS as i32 {
				a.set(v);
			}
		});
		for _ in 0..THREADS / 2 {
			s.spawn(|| {
				for _ in 0..ROUNDS {
					let token = doubled.subscribe_on_change(|_: &i32| {}).unwrap();
					drop(token);
				}
			});
		}
	});

	assert_eq!(doubled.change_subscribers(), 0);
	assert_eq!(doubled.get().unwrap(), ROUNDS as i32 * 2);
}
