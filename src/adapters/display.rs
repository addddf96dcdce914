//! Front-panel display adapter.
//!
//! The board has no screen driver yet, so [`LogDisplay`] renders the same
//! lines the OLED would show into the log.  Only changed screens are
//! written, which keeps the once-per-second refresh quiet.

use log::{info, warn};

use crate::app::ports::DisplayPort;
use crate::app::reports::{DisplayView, Screen};

fn temp(celsius: Option<f32>) -> String {
    celsius.map_or_else(|| "--.-".into(), |t| format!("{t:.1}"))
}

/// The two text lines of a status screen.
pub fn status_lines(view: &DisplayView) -> [String; 2] {
    [
        format!("{} {} PWR:{}%", view.status, view.mode, view.duty_percent),
        format!("T:{} SP:{}", temp(view.current_temp), temp(view.setpoint)),
    ]
}

#[derive(Default)]
pub struct LogDisplay {
    last: Option<Screen>,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last screen rendered.
    pub fn last(&self) -> Option<&Screen> {
        self.last.as_ref()
    }
}

impl DisplayPort for LogDisplay {
    fn show(&mut self, screen: &Screen) {
        if self.last.as_ref() == Some(screen) {
            return;
        }
        match screen {
            Screen::Status(view) => {
                let [top, bottom] = status_lines(view);
                info!("display: {} | {}", top, bottom);
            }
            Screen::Shutdown { reason: Some(reason) } => {
                warn!("display: TURNED OFF | {}", reason.reason());
            }
            Screen::Shutdown { reason: None } => warn!("display: TURNED OFF"),
        }
        self.last = Some(*screen);
    }
}
