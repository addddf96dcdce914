//! Integration tests for the Controller: power/mode state, safety filter,
//! PID duty, settings, schedule and reports, all against mock ports.

use core::time::Duration;

use brewctl::app::commands::AppCommand;
use brewctl::app::reports::{Screen, StatusText};
use brewctl::app::service::AlarmStep;
use brewctl::config::{Mode, Settings, Timing};
use brewctl::drivers::button::ButtonEvent;
use brewctl::error::{Error, SafetyTrip};
use brewctl::safety::Verdict;
use brewctl::scheduler::{ScheduleError, TimeOfDay};
use brewctl::sensors::zacwire::Reading;

use super::mock_hw::{HeaterCall, MockStore, rig, rig_with};

// ── Power & mode ──────────────────────────────────────────────

#[test]
fn starts_off_without_setpoint() {
    let (c, r) = rig();
    assert!(!c.is_on());
    assert_eq!(c.mode(), Mode::Espresso);
    assert_eq!(c.setpoint(), None);
    assert!(!r.sensor.running());
}

#[test]
fn power_on_takes_mode_target_and_starts_sensor() {
    let (mut c, r) = rig();
    assert_eq!(c.power(true), "Power set on");
    assert!(c.is_on());
    assert_eq!(c.setpoint(), Some(98.0));
    assert!(r.sensor.running());
}

#[test]
fn power_off_clears_setpoint_and_forces_heater_low() {
    let (mut c, r) = rig();
    c.power(true);
    assert_eq!(c.power(false), "Power set off");
    assert!(!c.is_on());
    assert_eq!(c.setpoint(), None);
    assert_eq!(c.duty(), 0.0);
    assert!(!r.sensor.running());
    assert_eq!(r.heater.last(), Some(HeaterCall::ForceOff));
}

#[test]
fn mode_switch_while_off_does_not_set_setpoint() {
    let (mut c, _r) = rig();
    assert_eq!(c.set_mode(Mode::Steam), "Mode set to steam");
    assert_eq!(c.setpoint(), None);
    c.power(true);
    assert_eq!(c.setpoint(), Some(120.0));
}

#[test]
fn button_events_toggle_power_and_mode() {
    let (mut c, _r) = rig();
    c.handle_command(AppCommand::from(ButtonEvent::ShortPress));
    assert!(c.is_on());
    c.handle_command(AppCommand::from(ButtonEvent::LongPress));
    assert_eq!(c.mode(), Mode::Steam);
    assert_eq!(c.setpoint(), Some(120.0));
    c.handle_command(AppCommand::from(ButtonEvent::ShortPress));
    assert!(!c.is_on());
}

// ── End to end ────────────────────────────────────────────────

#[test]
fn espresso_at_ninety_degrees_gives_eight_percent_then_steam_raises_duty() {
    let (mut c, r) = rig();
    c.power(true);
    r.sensor.set_celsius(90.0);

    assert!(matches!(c.sample(), Verdict::Accepted(_)));
    assert_eq!(c.current_temp(), Some(90.0));

    r.clock.advance_ms(100);
    let duty = c.update_duty();
    assert_eq!(duty, (8.0f32 / 100.0).min(1.0));
    assert_eq!(r.heater.last_duty(), Some(duty));

    c.set_mode(Mode::Steam);
    assert_eq!(c.setpoint(), Some(120.0));
    r.clock.advance_ms(100);
    let steam_duty = c.update_duty();
    assert!(steam_duty > duty, "{steam_duty} should exceed {duty}");
}

#[test]
fn pid_is_not_run_without_a_temperature() {
    let (mut c, r) = rig();
    c.power(true);
    r.clock.advance_ms(100);
    assert_eq!(c.update_duty(), 0.0);
    assert_eq!(r.heater.last_duty(), Some(0.0));
}

// ── Safety ────────────────────────────────────────────────────

#[test]
fn sentinel_keeps_previous_temperature() {
    let (mut c, r) = rig();
    c.power(true);
    r.sensor.set_celsius(93.0);
    c.sample();
    r.sensor.set_reading(Reading::WrongParity);
    assert_eq!(c.sample(), Verdict::NoReading);
    assert_eq!(c.current_temp(), Some(93.0));
}

#[test]
fn eleven_implausible_jumps_force_power_off() {
    let (mut c, r) = rig();
    c.power(true);
    r.sensor.set_celsius(90.0);
    c.sample();

    r.sensor.set_celsius(100.0);
    for n in 1..=10 {
        match c.sample() {
            Verdict::Rejected { consecutive, .. } => assert_eq!(consecutive, n),
            other => panic!("reading {n}: expected rejection, got {other:?}"),
        }
        assert!(c.is_on());
        assert_eq!(c.current_temp(), Some(90.0));
    }

    assert_eq!(
        c.sample(),
        Verdict::Trip(SafetyTrip::ImplausibleReadings)
    );
    assert!(!c.is_on());
    assert_eq!(c.setpoint(), None);
    assert!(r.heater.calls().contains(&HeaterCall::ForceOff));
    assert!(!r.heater.calls().contains(&HeaterCall::Shutdown));
    assert_eq!(c.trip_reason(), Some(SafetyTrip::ImplausibleReadings));
    assert_eq!(
        c.screen(),
        Screen::Shutdown {
            reason: Some(SafetyTrip::ImplausibleReadings)
        }
    );
}

#[test]
fn operator_can_power_on_again_after_trip() {
    let (mut c, r) = rig();
    c.power(true);
    r.sensor.set_celsius(90.0);
    c.sample();
    r.sensor.set_celsius(120.0);
    for _ in 0..11 {
        c.sample();
    }
    assert!(!c.is_on());

    c.power(true);
    assert!(c.is_on());
    assert_eq!(c.trip_reason(), None);
    assert!(matches!(c.sample(), Verdict::Accepted(_)));
    assert!(matches!(c.screen(), Screen::Status(_)));
}

#[test]
fn good_reading_resets_bad_counter() {
    let (mut c, r) = rig();
    c.power(true);
    r.sensor.set_celsius(90.0);
    c.sample();
    for _ in 0..2 {
        r.sensor.set_celsius(100.0);
        for _ in 0..10 {
            c.sample();
        }
        r.sensor.set_celsius(91.0);
        assert!(matches!(c.sample(), Verdict::Accepted(_)));
    }
    assert!(c.is_on());
}

// ── Idle sampling ─────────────────────────────────────────────

#[test]
fn idle_reading_powers_sensor_briefly_while_off() {
    let (mut c, r) = rig();
    r.sensor.set_celsius(24.0);
    c.wake_sensor();
    assert!(r.sensor.running());
    c.sample();
    c.rest_sensor();
    assert!(!r.sensor.running());
    assert_eq!(c.current_temp(), Some(24.0));
    assert_eq!(c.display_view().status, StatusText::Off);
}

#[test]
fn rest_keeps_sensor_on_when_powered_meanwhile() {
    let (mut c, r) = rig();
    c.wake_sensor();
    c.power(true);
    c.rest_sensor();
    assert!(r.sensor.running());
}

// ── Settings ──────────────────────────────────────────────────

#[test]
fn save_settings_applies_new_targets_and_gains() {
    let (mut c, _r) = rig();
    let store = MockStore::default();
    c.power(true);

    let mut s = Settings::default();
    s.mode_temps.espresso = 94.5;
    s.pid.kp = 2.0;
    assert!(c.save_settings(s, &store).is_ok());

    assert_eq!(c.get_settings(), s);
    assert_eq!(c.setpoint(), Some(94.5));
    assert_eq!(*store.saved.borrow(), Some(s));
}

#[test]
fn failed_save_leaves_state_untouched() {
    let (mut c, _r) = rig();
    let store = MockStore::default();
    store.fail.set(true);
    c.power(true);

    let mut s = Settings::default();
    s.mode_temps.espresso = 91.0;
    assert!(matches!(c.save_settings(s, &store), Err(Error::Config(_))));
    assert_eq!(c.get_settings(), Settings::default());
    assert_eq!(c.setpoint(), Some(98.0));
}

#[test]
fn invalid_settings_are_rejected() {
    let (mut c, _r) = rig();
    let store = MockStore::default();
    let mut s = Settings::default();
    s.pid.kd = -1.0;
    assert!(c.save_settings(s, &store).is_err());
    assert!(store.saved.borrow().is_none());
}

// ── Schedule ──────────────────────────────────────────────────

#[test]
fn schedule_in_the_past_lands_on_next_day() {
    let (mut c, r) = rig();
    r.clock.set_time_of_day(8, 0);
    let at: TimeOfDay = "07:30".parse().unwrap();
    assert_eq!(c.set_schedule(Some(at)), Ok(Some(at)));
    assert_eq!(c.scheduled(), Some(at));
    assert_eq!(c.alarm_step(), AlarmStep::Wait(Duration::from_secs(600)));

    let start = r.clock.unix.get().unwrap();
    r.clock.unix.set(Some(start + 84_600 - 1));
    assert_eq!(c.alarm_step(), AlarmStep::Wait(Duration::from_secs(1)));
    assert!(!c.is_on());

    r.clock.unix.set(Some(start + 84_600));
    assert_eq!(c.alarm_step(), AlarmStep::Due);
    c.fire_schedule();
    assert!(c.is_on());
    assert_eq!(c.scheduled(), None);
    assert_eq!(c.alarm_step(), AlarmStep::Idle);
}

#[test]
fn clearing_schedule_cancels_it() {
    let (mut c, _r) = rig();
    let at = TimeOfDay::new(6, 45).unwrap();
    c.set_schedule(Some(at)).unwrap();
    assert_eq!(c.set_schedule(None), Ok(None));
    assert_eq!(c.scheduled(), None);
    assert_eq!(c.alarm_step(), AlarmStep::Idle);
}

#[test]
fn schedule_needs_wall_clock() {
    let (mut c, r) = rig();
    r.clock.unset_wall_clock();
    let at = TimeOfDay::new(6, 45).unwrap();
    assert_eq!(c.set_schedule(Some(at)), Err(ScheduleError::ClockNotSet));
    assert_eq!(c.scheduled(), None);
}

#[test]
fn pending_schedule_shows_on_display_while_off() {
    let (mut c, _r) = rig();
    let at = TimeOfDay::new(6, 5).unwrap();
    c.set_schedule(Some(at)).unwrap();
    assert_eq!(c.display_view().status.to_string(), "On@06:05");
}

// ── Reports ───────────────────────────────────────────────────

#[test]
fn status_report_reflects_state() {
    let (mut c, r) = rig();
    c.power(true);
    r.sensor.set_celsius(90.0);
    c.sample();
    r.clock.advance_ms(100);
    c.update_duty();

    let status = serde_json::to_value(c.get_status(serde_json::json!(true))).unwrap();
    assert_eq!(status["power"], true);
    assert_eq!(status["current_temp"], 90.0);
    assert_eq!(status["setpoint"], 98.0);
    assert_eq!(status["mode"], "espresso");
    assert_eq!(status["on_interval"], true);
    assert!(status["alarm_time"].is_null());
    assert_eq!(c.display_view().duty_percent, 8);
}

#[test]
fn history_records_one_pair_per_cycle() {
    let (mut c, r) = rig();
    c.power(true);
    r.sensor.set_celsius(90.0);
    c.sample();
    c.record_temperature();
    c.record_setpoint();

    let h = c.get_history();
    assert_eq!(h.temperature_history.last(), Some(&Some(90.0)));
    assert_eq!(h.setpoint_history.last(), Some(&Some(98.0)));
    assert_eq!(h.temperature_history.len(), h.setpoint_history.len());
}

// ── Shutdown ──────────────────────────────────────────────────

#[test]
fn shut_down_stops_heater_and_refuses_power_on() {
    let (mut c, r) = rig_with(Settings::default(), &Timing::default());
    c.power(true);
    c.shut_down();

    assert!(!c.is_on());
    assert!(c.is_halted());
    assert_eq!(r.heater.last(), Some(HeaterCall::Shutdown));
    assert_eq!(c.screen(), Screen::Shutdown { reason: None });

    c.power(true);
    assert!(!c.is_on());
    c.wake_sensor();
    assert!(!r.sensor.running());
}
