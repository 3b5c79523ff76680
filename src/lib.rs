//! Remotepad Daemon Library
//!
//! This crate provides the core functionality for the remotepad daemon,
//! which exposes a set of typed UI control values over a line-oriented
//! TCP protocol and mirrors their state into an Avahi service file.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod registry;
pub mod socket;
pub mod validation;
