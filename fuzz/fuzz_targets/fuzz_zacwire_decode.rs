//! Fuzz target: `decode_intervals` / `ZacWire::begin_decode`
//!
//! Interprets the input as a stream of little-endian edge intervals and
//! replays it through the capture buffer, asserting that decoded codes
//! stay in the 11-bit range and the buffer never overruns.
//!
//! cargo fuzz run fuzz_zacwire_decode

#![no_main]

use brewctl::app::ports::SensorLine;
use brewctl::sensors::zacwire::{
    EdgeCapture, INTERVAL_COUNT, RAW_MAX, Reading, ZacWire, decode_intervals,
};
use libfuzzer_sys::fuzz_target;

struct Line;

impl SensorLine for Line {
    fn power_up(&mut self) {}
    fn power_down(&mut self) {}
}

static CAPTURE: EdgeCapture = EdgeCapture::new();

fuzz_target!(|data: &[u8]| {
    let mut dt = [0i32; INTERVAL_COUNT];
    for (slot, chunk) in dt.iter_mut().zip(data.chunks_exact(2)) {
        *slot = i32::from(i16::from_le_bytes([chunk[0], chunk[1]]));
    }

    if let Ok(code) = decode_intervals(&dt) {
        assert!(code <= RAW_MAX, "code {code} exceeds 11 bits");
    }

    let mut zw = ZacWire::new(Line, &CAPTURE);
    zw.start();
    CAPTURE.take();
    CAPTURE.replay(0, &dt);
    if let Reading::Raw(code) = zw.begin_decode() {
        assert!(code <= RAW_MAX);
        assert_eq!(zw.current_reading(0), Reading::Raw(code));
    }
});
