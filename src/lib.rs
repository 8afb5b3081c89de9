//documentation
#![doc = include_str!("../README.md")]

//module tree
mod backoff;
mod client;
mod common;
mod envelope;
mod errors;
mod heartbeat;
mod payloads;
mod registry;
mod session;
mod storage;
mod transport;

//API exports
pub use crate::backoff::*;
pub use crate::client::*;
pub use crate::common::*;
pub use crate::envelope::*;
pub use crate::errors::*;
pub(crate) use crate::heartbeat::*;
pub use crate::payloads::*;
pub use crate::registry::*;
pub use crate::session::*;
pub use crate::storage::*;
pub use crate::transport::*;
