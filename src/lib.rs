//! brewctl — espresso boiler temperature controller.
//!
//! The library holds everything but the boot sequence, so the decoder,
//! PID, safety filter and controller run under `cargo test` on the host.
//! Hardware access lives behind `#[cfg(target_os = "espidf")]` in
//! `drivers` and `adapters`; other targets get simulation stubs.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod safety;
pub mod scheduler;
pub mod sensors;
