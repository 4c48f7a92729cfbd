use std::error::Error as StdError;
use std::sync::Arc;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
	/// A user supplied generator failed. Stages of a pipe pass this through untouched.
	#[error("generator failed: {0}")]
	Generator(#[source] Arc<dyn StdError + Send + Sync>),

	#[error("notification channel is closed")]
	Closed,

	#[error("a computed cell needs at least one parent")]
	NoParents,

	/// A `filter` stage has not accepted any value yet.
	#[error("no value has passed the filter yet")]
	Empty,
}

impl Error {
	pub fn generator(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
		Error::Generator(Arc::from(err.into()))
	}

	pub fn is_generator(&self) -> bool {
		matches!(self, Error::Generator(_))
	}
}
