//! Integration tests for the cooperative runtime: tasks running on the
//! executor against mock ports, alarm task replacement, and shutdown.

use core::time::Duration;
use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use async_io_mini::Timer;
use brewctl::app::reports::Screen;
use brewctl::app::runtime::Runtime;
use brewctl::app::service::Controller;
use brewctl::config::{Settings, Timing};
use brewctl::drivers::heater::SoftPwm;
use brewctl::error::SafetyTrip;
use brewctl::scheduler::ScheduleError;
use embedded_hal::digital::{ErrorType, OutputPin};
use futures_lite::future::block_on;

use super::mock_hw::{MockButton, MockClock, MockDisplay, MockSensor, rig_with};

/// Fast cadences so a test cycle takes milliseconds.
fn fast_timing() -> Timing {
    Timing {
        sample_settle_ms: 5,
        history_step_ms: 1,
        control_rest_ms: 5,
        button_poll_ms: 5,
        idle_warmup_secs: 0,
        idle_period_secs: 1,
        ..Timing::default()
    }
}

async fn sleep(ms: u64) {
    Timer::after(Duration::from_millis(ms)).await;
}

#[test]
fn tasks_sample_control_and_display() {
    let timing = fast_timing();
    let (controller, r) = rig_with(Settings::default(), &timing);
    let rt = Runtime::new(controller, timing);
    let display = MockDisplay::default();
    rt.spawn_services(display.clone(), MockButton::default());

    rt.controller().borrow_mut().power(true);
    r.sensor.set_celsius(90.0);
    block_on(rt.run(sleep(150)));

    let c = rt.controller().borrow();
    assert_eq!(c.current_temp(), Some(90.0));
    assert_eq!(r.heater.last_duty(), Some(0.08));
    assert!(display.count() > 0);
    match display.last() {
        Some(Screen::Status(view)) => assert_eq!(view.duty_percent, 8),
        other => panic!("expected status screen, got {other:?}"),
    }
    assert!(c.get_history().temperature_history.contains(&Some(90.0)));
}

#[test]
fn short_button_press_powers_on() {
    let timing = fast_timing();
    let (controller, _r) = rig_with(Settings::default(), &timing);
    let rt = Runtime::new(controller, timing);
    let button = MockButton::default();
    rt.spawn_services(MockDisplay::default(), button.clone());

    block_on(rt.run(async {
        button.press();
        sleep(30).await;
        button.release();
        sleep(30).await;
    }));

    assert!(rt.controller().borrow().is_on());
}

#[test]
fn implausible_readings_trip_running_controller() {
    let timing = fast_timing();
    let (controller, r) = rig_with(Settings::default(), &timing);
    let rt = Runtime::new(controller, timing);
    let display = MockDisplay::default();
    rt.spawn_services(display.clone(), MockButton::default());

    rt.controller().borrow_mut().power(true);
    r.sensor.set_celsius(90.0);
    block_on(rt.run(async {
        sleep(20).await;
        r.sensor.set_celsius(130.0);
        sleep(300).await;
    }));

    let c = rt.controller().borrow();
    assert!(!c.is_on());
    assert_eq!(c.setpoint(), None);
    assert_eq!(
        display.last(),
        Some(Screen::Shutdown {
            reason: Some(SafetyTrip::ImplausibleReadings)
        })
    );
}

#[test]
fn rescheduling_replaces_pending_alarm() {
    let timing = fast_timing();
    let (controller, r) = rig_with(Settings::default(), &timing);
    r.clock.set_time_of_day(8, 0);
    let rt = Runtime::new(controller, timing);

    block_on(rt.run(async {
        assert_eq!(
            rt.schedule_power_on(Some("07:30")).await,
            Ok(Some("07:30".to_string()))
        );
        assert!(rt.alarm_pending());

        assert_eq!(
            rt.schedule_power_on(Some("9:05")).await,
            Ok(Some("09:05".to_string()))
        );
        assert!(rt.alarm_pending());
        assert_eq!(
            rt.controller().borrow().scheduled().map(|t| t.to_string()),
            Some("09:05".to_string())
        );

        assert_eq!(rt.schedule_power_on(None).await, Ok(None));
        assert!(!rt.alarm_pending());
        assert_eq!(rt.controller().borrow().scheduled(), None);
    }));
}

#[test]
fn invalid_alarm_time_keeps_nothing_scheduled() {
    let timing = fast_timing();
    let (controller, _r) = rig_with(Settings::default(), &timing);
    let rt = Runtime::new(controller, timing);

    block_on(rt.run(async {
        assert_eq!(
            rt.schedule_power_on(Some("25:00")).await,
            Err(ScheduleError::InvalidTime)
        );
        assert_eq!(
            rt.schedule_power_on(Some("seven")).await,
            Err(ScheduleError::InvalidTime)
        );
        assert!(!rt.alarm_pending());
    }));
}

#[test]
fn alarm_task_powers_on_when_due() {
    let timing = fast_timing();
    let (controller, r) = rig_with(Settings::default(), &timing);
    r.clock.set_time_of_day(6, 59);
    let rt = Runtime::new(controller, timing);

    block_on(rt.run(async {
        rt.schedule_power_on(Some("07:00")).await.unwrap();
        r.clock.set_time_of_day(7, 0);
        sleep(20).await;
    }));

    let c = rt.controller().borrow();
    assert!(c.is_on());
    assert_eq!(c.scheduled(), None);
    assert!(!rt.alarm_pending());
}

#[test]
fn failed_reschedule_keeps_pending_alarm() {
    let timing = fast_timing();
    let (controller, r) = rig_with(Settings::default(), &timing);
    r.clock.set_time_of_day(7, 29);
    let rt = Runtime::new(controller, timing);

    block_on(rt.run(async {
        rt.schedule_power_on(Some("07:30")).await.unwrap();

        r.clock.unset_wall_clock();
        assert_eq!(
            rt.schedule_power_on(Some("09:00")).await,
            Err(ScheduleError::ClockNotSet)
        );
        assert!(rt.alarm_pending());
        assert_eq!(
            rt.controller().borrow().scheduled().map(|t| t.to_string()),
            Some("07:30".to_string())
        );

        r.clock.set_time_of_day(7, 31);
        sleep(20).await;
    }));

    let c = rt.controller().borrow();
    assert!(c.is_on());
    assert_eq!(c.scheduled(), None);
    assert!(!rt.alarm_pending());
}

// ── Shutdown with the real PWM driver ─────────────────────────

#[derive(Clone, Default)]
struct RecordingPin(Rc<Cell<bool>>);

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set(true);
        Ok(())
    }
}

#[test]
fn shut_down_stops_pwm_and_blocks_power_on() {
    let timing = fast_timing();
    let pin = RecordingPin::default();
    let pwm = Rc::new(SoftPwm::new(pin.clone(), 1.0, 0.0));
    let controller = Controller::new(
        Settings::default(),
        &timing,
        MockSensor::default(),
        Rc::clone(&pwm),
        MockClock::new(),
    );
    let rt = Runtime::new(controller, timing);
    rt.spawn_heater(Rc::clone(&pwm));

    block_on(rt.run(async {
        rt.controller().borrow_mut().power(true);
        pwm.set_duty(1.0);
        sleep(10).await;
        assert!(pwm.is_running());

        rt.shut_down().await;
    }));

    assert!(!pwm.is_running());
    assert!(!pin.0.get(), "SSR must be low after shutdown");
    let mut c = rt.controller().borrow_mut();
    assert_eq!(c.power(true), "Controller is shut down");
    assert!(!c.is_on());
}
