//! brewctl Firmware — Main Entry Point
//!
//! Hexagonal architecture on a single cooperative executor.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  ZacWire+TsicLine  SoftPwm<GpioOut>  NvsAdapter   Esp32Time    │
//! │  (SensorPort)      (HeaterPort)      (ConfigPort) (ClockPort)  │
//! │  LogDisplay        GpioIn (button)                             │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Controller (pure logic)                   │    │
//! │  │  Safety · PID · History · Power-on schedule            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Runtime: decode · sampling · control · button · heater tasks  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::rc::Rc;

use anyhow::{Result, anyhow};
use log::{error, info};

use brewctl::adapters::display::LogDisplay;
use brewctl::adapters::hardware::{GpioIn, GpioOut, TsicLine};
use brewctl::adapters::nvs::{self, NvsAdapter};
use brewctl::adapters::time::Esp32TimeAdapter;
use brewctl::app::runtime::Runtime;
use brewctl::app::service::Controller;
use brewctl::config::Timing;
use brewctl::drivers::heater::SoftPwm;
use brewctl::drivers::{hw_init, hw_timer};
use brewctl::pins;
use brewctl::sensors::{EDGE_CAPTURE, ZacWire};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  brewctl v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    // SSR and sensor supply come up low; without them nothing is safe to run.
    hw_init::init_peripherals().map_err(|e| anyhow!("HAL init failed: {e}"))?;
    hw_timer::init_decode_timer().map_err(|e| anyhow!("decode timer: {e}"))?;
    if let Err(e) = hw_init::init_isr_service() {
        error!("ISR service init failed: {}; no temperature readings", e);
    }

    // ── 3. Settings from NVS (or defaults) ────────────────────
    let store = NvsAdapter::new().unwrap_or_else(|e| {
        error!("NVS init failed ({}), running with defaults", e);
        NvsAdapter::unbacked()
    });
    let settings = nvs::load_or_default(&store);
    let timing = Timing::default();

    // ── 4. Adapters + controller ──────────────────────────────
    let sensor = ZacWire::new(TsicLine::new(), &EDGE_CAPTURE);
    let heater = Rc::new(SoftPwm::new(
        GpioOut::new(pins::SSR_GPIO),
        timing.pwm_freq_hz,
        0.0,
    ));
    let controller = Controller::new(
        settings,
        &timing,
        sensor,
        Rc::clone(&heater),
        Esp32TimeAdapter::new(),
    );

    // ── 5. Tasks ──────────────────────────────────────────────
    let runtime = Runtime::new(controller, timing);
    runtime.spawn_heater(heater);
    runtime.spawn_services(LogDisplay::new(), GpioIn::new(pins::BUTTON_GPIO));

    info!(
        "brewctl ready: espresso {:.1} °C, steam {:.1} °C, PID {}/{}/{}",
        settings.mode_temps.espresso,
        settings.mode_temps.steam,
        settings.pid.kp,
        settings.pid.ki,
        settings.pid.kd
    );

    futures_lite::future::block_on(runtime.run(core::future::pending::<()>()));
    Ok(())
}
