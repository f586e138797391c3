//! Open Media Transport - engine interface.
//!
//! The C library ([`libomt`](../libomt)) never talks to the network itself. It drives an [`Engine`],
//! a capability set for sending, receiving and discovering media sources:
//!
//! - **Sender**: publishes video, audio and metadata frames under a name.
//! - **Receiver**: connects to a sender address and pulls frames of the requested types.
//! - **Discovery**: lists the sender addresses currently visible.
//! - **Settings**: process-wide key/value configuration.
//!
//! [`LocalEngine`] wires senders and receivers together inside a single process.
//! It is the default engine for the C library and the one used by the tests.

mod engine;
mod error;
mod frame;
mod info;
mod local;
mod runtime;
mod settings;
mod stats;
mod tally;

pub use engine::*;
pub use error::*;
pub use frame::*;
pub use info::*;
pub use local::*;
pub use settings::*;
pub use stats::*;
pub use tally::*;
