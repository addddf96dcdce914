//! Application core.
//!
//! [`service::Controller`] holds the control state and rules; it talks to
//! hardware only through the [`ports`] traits.  [`runtime`] wraps it in the
//! cooperative tasks, and [`api`] maps front-end requests onto it.

pub mod api;
pub mod commands;
pub mod history;
pub mod ports;
pub mod reports;
pub mod runtime;
pub mod service;
