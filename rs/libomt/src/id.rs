use std::num::NonZero;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::Error;

// The low half of an id is the slot index + 1, the high half is that slot's generation.
const SHIFT: u32 = usize::BITS / 2;
const INDEX_MASK: usize = (1 << SHIFT) - 1;
const GENERATION_MASK: usize = usize::MAX >> SHIFT;

/// An opaque token handed out to C in place of a pointer.
///
/// Never zero, and never reissued: a slot that has used up its generations is retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(NonZero<usize>);

impl Id {
	fn new(index: usize, generation: usize) -> Result<Self, Error> {
		let index = index.checked_add(1).filter(|i| *i <= INDEX_MASK).ok_or(Error::TooManyHandles)?;
		if generation > GENERATION_MASK {
			return Err(Error::TooManyHandles);
		}
		let token = (generation << SHIFT) | index;
		NonZero::new(token).map(Id).ok_or(Error::TooManyHandles)
	}

	fn index(self) -> usize {
		(self.0.get() & INDEX_MASK) - 1
	}

	fn generation(self) -> usize {
		self.0.get() >> SHIFT
	}

	/// Read a handle back from the opaque pointer given to C.
	pub fn from_ptr<T>(ptr: *const T) -> Result<Self, Error> {
		NonZero::new(ptr as usize)
			.map(Id)
			.filter(|id| id.0.get() & INDEX_MASK != 0)
			.ok_or(Error::InvalidHandle)
	}

	/// The opaque pointer given to C; it is never dereferenced.
	pub fn into_ptr<T>(self) -> *mut T {
		self.0.get() as *mut T
	}
}

impl std::fmt::Display for Id {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.index(), self.generation())
	}
}

struct Entry<T> {
	/// The generation last issued from this slot.
	generation: usize,
	value: Option<Arc<T>>,
}

struct Slots<T> {
	entries: Vec<Entry<T>>,
	/// Vacant slots with generations left, reused last-freed first.
	free: Vec<usize>,
	max_generation: usize,
}

/// Maps [Id]s to shared objects.
///
/// Lookups hand back an [Arc] so the lock is never held while the object is in use.
pub(crate) struct Registry<T> {
	slots: Mutex<Slots<T>>,
}

impl<T> Registry<T> {
	fn with_max_generation(max_generation: usize) -> Self {
		Self {
			slots: Mutex::new(Slots {
				entries: Vec::new(),
				free: Vec::new(),
				max_generation,
			}),
		}
	}

	pub fn insert(&self, value: T) -> Result<Id, Error> {
		let mut slots = self.slots.lock();

		let id = match slots.free.last() {
			Some(&index) => Id::new(index, slots.entries[index].generation + 1)?,
			None => Id::new(slots.entries.len(), 1)?,
		};

		let entry = Entry {
			generation: id.generation(),
			value: Some(Arc::new(value)),
		};
		match slots.free.pop() {
			Some(index) => slots.entries[index] = entry,
			None => slots.entries.push(entry),
		}

		Ok(id)
	}

	pub fn get(&self, id: Id) -> Option<Arc<T>> {
		let slots = self.slots.lock();
		let entry = slots.entries.get(id.index())?;
		if entry.generation != id.generation() {
			return None;
		}
		entry.value.clone()
	}

	pub fn remove(&self, id: Id) -> Option<Arc<T>> {
		let mut slots = self.slots.lock();
		let Slots {
			entries,
			free,
			max_generation,
		} = &mut *slots;

		let entry = entries.get_mut(id.index())?;
		if entry.generation != id.generation() {
			return None;
		}
		let value = entry.value.take()?;

		if entry.generation < *max_generation {
			free.push(id.index());
		} else {
			tracing::debug!(%id, "handle slot retired");
		}

		Some(value)
	}

	/// The number of live handles.
	pub fn len(&self) -> usize {
		self.slots.lock().entries.iter().filter(|entry| entry.value.is_some()).count()
	}
}

impl<T> Default for Registry<T> {
	fn default() -> Self {
		Self::with_max_generation(GENERATION_MASK)
	}
}
