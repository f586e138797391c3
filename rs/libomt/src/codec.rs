//! Strings across the boundary.
//!
//! Caller buffers use a two-phase protocol: pass null to learn the required size (terminator included),
//! then pass a buffer strictly larger than that. A buffer that is too small gets nothing and a return of 0.

use std::ffi::{c_char, c_int, CStr, CString};

use crate::Error;

/// Write `value` plus a terminator into `dst`, returning the required length or 0 if it didn't fit.
///
/// # Safety
/// `dst` must be null or valid for writes of `max_length` bytes.
pub unsafe fn write_string(value: &str, dst: *mut c_char, max_length: c_int) -> c_int {
	let required = value.len() + 1;
	let Ok(required_int) = c_int::try_from(required) else {
		return 0;
	};

	if dst.is_null() {
		return required_int;
	}

	// A buffer of exactly the required size is rejected.
	if usize::try_from(max_length).map_or(true, |max| max <= required) {
		return 0;
	}

	unsafe {
		std::ptr::copy_nonoverlapping(value.as_ptr(), dst.cast::<u8>(), value.len());
		*dst.add(value.len()) = 0;
	}

	required_int
}

/// Borrow a required, null-terminated UTF-8 string.
///
/// # Safety
/// `ptr` must be null or point to a null-terminated string that outlives `'a`.
pub unsafe fn read_str<'a>(ptr: *const c_char) -> Result<&'a str, Error> {
	if ptr.is_null() {
		return Err(Error::InvalidPointer);
	}

	Ok(unsafe { CStr::from_ptr(ptr) }.to_str()?)
}

/// Decode an optional string, replacing invalid UTF-8. Null reads as `None`.
///
/// # Safety
/// Same as [read_str].
pub unsafe fn read_string_lossy(ptr: *const c_char) -> Option<String> {
	if ptr.is_null() {
		return None;
	}

	Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Decode a buffer of at most `len` bytes, stopping at the first terminator.
///
/// # Safety
/// `ptr` must be null or valid for reads of `len` bytes.
pub unsafe fn read_bounded(ptr: *const c_char, len: c_int) -> Result<Option<String>, Error> {
	let len = usize::try_from(len).map_err(|_| Error::InvalidLength(len))?;
	if ptr.is_null() || len == 0 {
		return Ok(None);
	}

	let bytes = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) };
	Ok(Some(decode_until_nul(bytes)))
}

fn decode_until_nul(bytes: &[u8]) -> String {
	let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
	String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Read a fixed-width field, which may lack a terminator if completely full.
pub fn read_fixed<const N: usize>(field: &[c_char; N]) -> String {
	let bytes: [u8; N] = field.map(|c| c as u8);
	decode_until_nul(&bytes)
}

/// Fill a fixed-width field, truncating on a character boundary and zeroing the remainder.
pub fn write_fixed<const N: usize>(value: &str, field: &mut [c_char; N]) {
	let Some(capacity) = N.checked_sub(1) else {
		return;
	};

	let mut end = value.len().min(capacity);
	while !value.is_char_boundary(end) {
		end -= 1;
	}

	field.fill(0);
	for (dst, src) in field.iter_mut().zip(&value.as_bytes()[..end]) {
		*dst = *src as c_char;
	}
}

/// Turn a Rust string into an owned C string, dropping interior nul bytes.
pub fn to_cstring(value: &str) -> CString {
	CString::new(value).unwrap_or_else(|_| CString::new(value.replace('\0', "")).unwrap_or_default())
}

/// An array of C strings handed to the caller, freed on drop.
///
/// Each string is its own allocation, freed and nulled before the array itself.
pub struct StringArray {
	ptrs: Box<[*mut c_char]>,
}

// The pointers are uniquely owned by the array.
unsafe impl Send for StringArray {}

impl StringArray {
	pub fn new<S: AsRef<str>>(values: &[S]) -> Self {
		let ptrs = values
			.iter()
			.map(|value| to_cstring(value.as_ref()).into_raw())
			.collect();
		Self { ptrs }
	}

	pub fn as_mut_ptr(&mut self) -> *mut *mut c_char {
		self.ptrs.as_mut_ptr()
	}

	pub fn len(&self) -> usize {
		self.ptrs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ptrs.is_empty()
	}
}

#[cfg(test)]
thread_local! {
	/// Strings released by [StringArray] on this thread.
	pub(crate) static FREED_STRINGS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

impl Drop for StringArray {
	fn drop(&mut self) {
		for ptr in self.ptrs.iter_mut() {
			if !ptr.is_null() {
				drop(unsafe { CString::from_raw(*ptr) });
				*ptr = std::ptr::null_mut();

				#[cfg(test)]
				FREED_STRINGS.with(|freed| freed.set(freed.get() + 1));
			}
		}
	}
}
