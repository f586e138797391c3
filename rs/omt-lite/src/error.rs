#[derive(Debug, thiserror::Error, Clone)]
pub enum Error {
	#[error("not connected")]
	NotConnected,

	#[error("closed")]
	Closed,

	#[error("invalid frame: {0}")]
	InvalidFrame(&'static str),

	#[error("unsupported frame type: {0:?}")]
	Unsupported(crate::FrameType),

	#[error("invalid address: {0}")]
	InvalidAddress(String),

	#[error("url error: {0}")]
	Url(#[from] url::ParseError),

	#[error("no free port in {0}..={1}")]
	PortsExhausted(i32, i32),
}
