use std::sync::Arc;

#[derive(Debug, thiserror::Error, Clone)]
pub enum Error {
	#[error("engine error: {0}")]
	Engine(#[from] omt_lite::Error),

	#[error("utf8 error: {0}")]
	Utf8(#[from] std::str::Utf8Error),

	#[error("invalid pointer")]
	InvalidPointer,

	#[error("invalid handle")]
	InvalidHandle,

	#[error("not found")]
	NotFound,

	#[error("handle has the wrong type")]
	WrongHandle,

	#[error("too many handles")]
	TooManyHandles,

	#[error("unknown frame type: {0}")]
	UnknownFrameType(i32),

	#[error("invalid length: {0}")]
	InvalidLength(i32),

	#[error("filter error: {0}")]
	Filter(Arc<tracing_subscriber::filter::ParseError>),

	#[error("log error: {0}")]
	Log(Arc<tracing_subscriber::reload::Error>),

	#[error("engine already installed")]
	AlreadyInstalled,

	#[error("panic: {0}")]
	Panic(String),
}

impl From<tracing_subscriber::filter::ParseError> for Error {
	fn from(err: tracing_subscriber::filter::ParseError) -> Self {
		Error::Filter(Arc::new(err))
	}
}

impl From<tracing_subscriber::reload::Error> for Error {
	fn from(err: tracing_subscriber::reload::Error) -> Self {
		Error::Log(Arc::new(err))
	}
}

impl Error {
	/// Errors caused by the caller handing us something unusable, rather than something going wrong inside.
	pub fn is_misuse(&self) -> bool {
		matches!(
			self,
			Error::InvalidPointer | Error::InvalidHandle | Error::NotFound | Error::WrongHandle
		)
	}

	/// Log the error against the export that produced it.
	pub fn report(&self, name: &'static str) {
		if self.is_misuse() {
			tracing::debug!(export = name, "{}", self);
		} else {
			tracing::error!(export = name, "{}", self);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_misuse() {
		assert!(Error::InvalidPointer.is_misuse());
		assert!(Error::WrongHandle.is_misuse());
		assert!(!Error::Panic("boom".into()).is_misuse());
		assert!(!Error::Engine(omt_lite::Error::Closed).is_misuse());
	}
}
