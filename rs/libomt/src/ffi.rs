use std::any::Any;
use std::cell::RefCell;
use std::ffi::{c_char, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use omt_lite::Timeout;

use crate::{codec, log, Error};

thread_local! {
	static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Runs the body of an export, converting every failure into the neutral value for its return type.
///
/// Errors and panics never cross the boundary. They are logged against `name` and the message is kept
/// for [last_error] on the calling thread.
pub fn enter<R: ReturnValue, F: FnOnce() -> Result<R, Error>>(name: &'static str, f: F) -> R {
	let err = match catch_unwind(AssertUnwindSafe(|| {
		log::init();
		f()
	})) {
		Ok(Ok(ret)) => return ret,
		Ok(Err(err)) => err,
		Err(payload) => Error::Panic(panic_message(payload.as_ref())),
	};

	// Reporting must not turn a handled failure into an unwinding one.
	let _ = catch_unwind(AssertUnwindSafe(|| {
		set_last_error(&err);
		err.report(name);
	}));

	R::neutral()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&str>() {
		msg.to_string()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"unknown panic".to_string()
	}
}

fn set_last_error(err: &Error) {
	// Gone once the thread is exiting; the error is still logged.
	let _ = LAST_ERROR.try_with(|last| *last.borrow_mut() = Some(err.to_string()));
}

/// Copy the last error recorded on this thread into `dst`, sized the same way as every string getter.
///
/// Returns 0 during thread teardown, once the thread's storage is gone.
///
/// # Safety
/// `dst` must be null or valid for `max_length` bytes.
pub unsafe fn last_error(dst: *mut c_char, max_length: c_int) -> c_int {
	LAST_ERROR
		.try_with(|last| match last.borrow().as_deref() {
			Some(msg) => unsafe { codec::write_string(msg, dst, max_length) },
			None => 0,
		})
		.unwrap_or(0)
}

/// The value an export returns when it has nothing better to say.
pub trait ReturnValue {
	fn neutral() -> Self;
}

impl ReturnValue for () {
	fn neutral() -> Self {}
}

impl ReturnValue for c_int {
	fn neutral() -> Self {
		0
	}
}

impl<T> ReturnValue for *mut T {
	fn neutral() -> Self {
		std::ptr::null_mut()
	}
}

/// Negative timeouts leave the wait up to the engine.
pub fn parse_timeout(milliseconds: c_int) -> Timeout {
	u64::try_from(milliseconds).ok().map(Duration::from_millis)
}

/// Saturate a byte count into the C return type.
pub fn to_int(value: usize) -> c_int {
	c_int::try_from(value).unwrap_or(c_int::MAX)
}
