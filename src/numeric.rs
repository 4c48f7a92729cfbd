use std::fmt::Debug;

/// Primitive number kinds with lossy conversions between them.
///
/// Conversions use `as` semantics: floats truncate toward zero and saturate at
/// the bounds of the integer type, `NaN` becomes zero.
pub trait Numeric: Copy + PartialEq + PartialOrd + Debug + Send + Sync + 'static {
	fn from_i32(value: i32) -> Self;
	fn from_i64(value: i64) -> Self;
	fn from_f64(value: f64) -> Self;

	fn to_i32(self) -> i32;
	fn to_i64(self) -> i64;
	fn to_f64(self) -> f64;
}

macro_rules! numeric {
	($($ty:ty),*) => {
		$(
			impl Numeric for $ty {
				#[inline]
				fn from_i32(value: i32) -> Self {
					value as $ty
				}

				#[inline]
				fn from_i64(value: i64) -> Self {
					value as $ty
				}

				#[inline]
				fn from_f64(value: f64) -> Self {
					value as $ty
				}

				#[inline]
				fn to_i32(self) -> i32 {
					self as i32
				}

				#[inline]
				fn to_i64(self) -> i64 {
					self as i64
				}

				#[inline]
				fn to_f64(self) -> f64 {
					self as f64
				}
			}
		)*
	};
}

numeric!(i32, i64, f64);

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn conversions_truncate_and_saturate() {
		assert_eq!(i32::from_f64(2.9), 2);
		assert_eq!(i32::from_f64(-2.9), -2);
		assert_eq!(i32::from_i64(i64::MAX), -1);
		assert_eq!(i32::from_f64(f64::MAX), i32::MAX);
		assert_eq!(i64::from_f64(f64::NAN), 0);
		assert_eq!(3.0f64.to_i64(), 3);
		assert_eq!(7i64.to_f64(), 7.0);
	}
}
