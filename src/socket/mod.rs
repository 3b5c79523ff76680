//! TCP socket server.

mod connection;
mod listener;

pub use listener::ControlServer;
