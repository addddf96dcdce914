//! Boiler temperature sensing.
//!
//! The only sensor is a TSic 306 on a single ZACwire data line; see
//! [`zacwire`] for the capture/decode pipeline.

pub mod zacwire;

pub use zacwire::{CAPTURE_READY, EDGE_CAPTURE, Reading, ZacWire};
