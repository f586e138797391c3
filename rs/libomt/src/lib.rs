//! C bindings for [`omt_lite`].
//!
//! Provides the Open Media Transport C API: senders publish video, audio and metadata under a
//! discoverable name, receivers connect by name and pull frames.
//!
//! ## Concepts
//!
//! - **Send**: A named source, `HOSTNAME (name)`, that receivers connect to
//! - **Receive**: A connection to one source, filtered by frame type
//! - **Discovery**: The addresses of every source currently visible
//! - **Settings**: Process-wide key/value configuration
//!
//! ## Error Handling
//!
//! No function reports failure through its return value beyond a null pointer or 0. The reason is
//! logged and can be read back with `omt_last_error` on the same thread.
//!
//! Handles are opaque tokens, not pointers. A destroyed handle is never reissued, so passing one
//! again is a logged no-op rather than undefined behavior.
//!
//! ## Frame Lifetime
//!
//! A frame returned by a receive stays valid until the next receive returning the same frame type
//! on that handle, or until the handle is destroyed.

mod api;
mod base;
mod codec;
mod discovery;
mod enums;
mod error;
mod ffi;
mod id;
mod log;
mod marshal;
mod receive;
mod retain;
mod send;
mod state;

pub use api::*;
pub use enums::*;
pub use error::*;
pub use id::Id;
pub use marshal::*;
pub use state::install;

pub(crate) use base::*;
pub(crate) use discovery::*;
pub(crate) use id::Registry;
pub(crate) use marshal::RetainedFrame;
pub(crate) use receive::*;
pub(crate) use retain::*;
pub(crate) use send::*;
pub(crate) use state::Context;
