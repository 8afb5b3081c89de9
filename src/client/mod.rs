//module tree
mod ack_tracker;
mod client;
mod client_event;
mod client_handler;
mod config;
mod errors;
mod offline_queue;
mod send_signal;

//API exports
pub use ack_tracker::*;
pub use client::*;
pub use client_event::*;
pub(crate) use client_handler::*;
pub use config::*;
pub use errors::*;
pub use offline_queue::*;
pub use send_signal::*;
