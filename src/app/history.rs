//! Fixed-length temperature / setpoint history for the trend chart.

use heapless::HistoryBuffer;

pub const HISTORY_LEN: usize = 600;

pub struct History {
    temperatures: HistoryBuffer<Option<f32>, HISTORY_LEN>,
    setpoints: HistoryBuffer<Option<f32>, HISTORY_LEN>,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            temperatures: HistoryBuffer::new(),
            setpoints: HistoryBuffer::new(),
        }
    }

    pub fn push_temperature(&mut self, celsius: Option<f32>) {
        self.temperatures.write(celsius);
    }

    pub fn push_setpoint(&mut self, celsius: Option<f32>) {
        self.setpoints.write(celsius);
    }

    pub fn temperatures(&self) -> Vec<Option<f32>> {
        padded(&self.temperatures)
    }

    pub fn setpoints(&self) -> Vec<Option<f32>> {
        padded(&self.setpoints)
    }
}

fn padded(buf: &HistoryBuffer<Option<f32>, HISTORY_LEN>) -> Vec<Option<f32>> {
    let mut out = vec![None; HISTORY_LEN - buf.len()];
    out.extend(buf.oldest_ordered().copied());
    out
}
