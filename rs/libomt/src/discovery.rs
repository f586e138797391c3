use std::ffi::{c_char, c_int};

use parking_lot::Mutex;

use crate::{codec::StringArray, ffi, Error};

/// The process-wide discovery, with the address list most recently handed to C.
pub(crate) struct DiscoveryFacade {
	discovery: Box<dyn omt_lite::Discovery>,
	last: Mutex<Option<StringArray>>,
}

impl DiscoveryFacade {
	pub fn new(discovery: Box<dyn omt_lite::Discovery>) -> Self {
		Self {
			discovery,
			last: Mutex::new(None),
		}
	}

	/// Replace the cached list with the current addresses, freeing the previous one.
	///
	/// Returns null, with a count of 0, when nothing has been discovered.
	pub fn addresses(&self, count: &mut c_int) -> Result<*mut *mut c_char, Error> {
		let addresses = self.discovery.addresses()?;

		let mut last = self.last.lock();
		last.take();

		if addresses.is_empty() {
			*count = 0;
			return Ok(std::ptr::null_mut());
		}

		let array = last.insert(StringArray::new(&addresses));
		*count = ffi::to_int(array.len());

		Ok(array.as_mut_ptr())
	}
}
