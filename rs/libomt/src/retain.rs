use parking_lot::Mutex;

/// Holds the last value handed out to C for one kind of output.
///
/// Storing a new value frees the previous one first, so at most one is alive per slot.
/// Callers must not use a returned pointer after the next call of the same kind on the same handle.
pub(crate) struct Slot<T> {
	value: Mutex<Option<T>>,
}

impl<T> Slot<T> {
	/// Replace the held value and return `f` applied to the new one.
	pub fn put<R, F: FnOnce(&T) -> R>(&self, value: T, f: F) -> R {
		let mut slot = self.value.lock();
		drop(slot.take());
		f(slot.insert(value))
	}

	pub fn clear(&self) {
		let old = self.value.lock().take();
		drop(old);
	}

	pub fn is_empty(&self) -> bool {
		self.value.lock().is_none()
	}
}

impl<T> Default for Slot<T> {
	fn default() -> Self {
		Self {
			value: Mutex::new(None),
		}
	}
}
