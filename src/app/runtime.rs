//! Cooperative runtime — the controller's long-running tasks.
//!
//! Every task runs on one `edge_executor::LocalExecutor` and sleeps through
//! `async-io-mini` reactor timers.  State is shared as
//! `Rc<RefCell<Controller>>`; a borrow is always dropped before the next
//! `.await`, so no task ever observes another mid-update.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────────┐
//!  │  futures_lite::future::block_on                             │
//!  │  ┌──────────────────────────────────────────────────────────┐│
//!  │  │  edge_executor::LocalExecutor                            ││
//!  │  │                                                          ││
//!  │  │  decode     sampling    control    button   heater alarm ││
//!  │  │  (signal)   1 s / 10 s  1 s        50 ms    PWM    ≤600 s ││
//!  │  └──────────────────────────────────────────────────────────┘│
//!  └──────────────────────────────────────────────────────────────┘
//! ```

use core::cell::RefCell;
use core::future::Future;
use core::time::Duration;
use std::rc::Rc;

use async_io_mini::Timer;
use edge_executor::{LocalExecutor, Task};
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, info, warn};

use crate::config::Timing;
use crate::drivers::button::ButtonDriver;
use crate::drivers::heater::SoftPwm;
use crate::scheduler::{ScheduleError, TimeOfDay};
use crate::sensors::zacwire::{CAPTURE_READY, Reading};

use super::commands::AppCommand;
use super::ports::{ClockPort, DisplayPort, HeaterPort, SensorPort};
use super::service::{AlarmStep, Controller};

pub const MAX_TASKS: usize = 8;

pub type Shared<S, H, C> = Rc<RefCell<Controller<S, H, C>>>;

async fn sleep_ms(ms: u64) {
    Timer::after(Duration::from_millis(ms)).await;
}

// ── Tasks ────────────────────────────────────────────────────

/// Decode each burst as soon as the post-capture timer fires.
async fn decode_task<S: SensorPort, H: HeaterPort, C: ClockPort>(ctx: Shared<S, H, C>) {
    loop {
        CAPTURE_READY.wait().await;
        if let Reading::WrongParity = ctx.borrow_mut().decode_capture() {
            debug!("decode: frame rejected");
        }
    }
}

/// Feed the safety filter and refresh the display.
///
/// While ON this samples every second.  While OFF the sensor is powered
/// briefly every `idle_period_secs` so the display still shows the boiler
/// temperature; switching on cuts the idle wait short.
async fn sampling_task<S, H, C, D>(ctx: Shared<S, H, C>, mut display: D, timing: Timing)
where
    S: SensorPort,
    H: HeaterPort,
    C: ClockPort,
    D: DisplayPort,
{
    loop {
        let on = ctx.borrow().is_on();
        if on {
            ctx.borrow_mut().sample();
            sleep_ms(timing.sample_settle_ms).await;
            let screen = ctx.borrow().screen();
            display.show(&screen);
            sleep_ms(timing.sample_settle_ms).await;
            continue;
        }

        if ctx.borrow().is_halted() {
            let screen = ctx.borrow().screen();
            display.show(&screen);
            return;
        }

        ctx.borrow_mut().wake_sensor();
        sleep_ms(timing.idle_warmup_secs * 1_000).await;
        {
            let mut c = ctx.borrow_mut();
            c.sample();
            display.show(&c.screen());
            c.rest_sensor();
        }
        for _ in 0..timing.idle_period_secs {
            if ctx.borrow().is_on() {
                break;
            }
            sleep_ms(1_000).await;
        }
    }
}

/// History, then PID, once per control cycle.
async fn control_task<S: SensorPort, H: HeaterPort, C: ClockPort>(
    ctx: Shared<S, H, C>,
    timing: Timing,
) {
    loop {
        ctx.borrow_mut().record_temperature();
        sleep_ms(timing.history_step_ms).await;
        ctx.borrow_mut().record_setpoint();
        sleep_ms(timing.history_step_ms).await;
        ctx.borrow_mut().update_duty();
        sleep_ms(timing.control_rest_ms).await;
    }
}

async fn button_task<S, H, C, P>(ctx: Shared<S, H, C>, mut pin: P, timing: Timing)
where
    S: SensorPort,
    H: HeaterPort,
    C: ClockPort,
    P: InputPin,
{
    let mut button = ButtonDriver::new(timing.long_press_ms);
    loop {
        let now_ms = ctx.borrow().uptime_ms() as u32;
        if let Some(event) = button.poll(&mut pin, now_ms) {
            let msg = ctx.borrow_mut().handle_command(AppCommand::from(event));
            info!("button: {:?} -> {}", event, msg);
        }
        sleep_ms(timing.button_poll_ms).await;
    }
}

/// Wait for the pending power-on in bounded chunks, then fire it.
async fn alarm_task<S: SensorPort, H: HeaterPort, C: ClockPort>(ctx: Shared<S, H, C>) {
    loop {
        let step = ctx.borrow().alarm_step();
        match step {
            AlarmStep::Idle => return,
            AlarmStep::Wait(chunk) => {
                Timer::after(chunk).await;
            }
            AlarmStep::Due => {
                ctx.borrow_mut().fire_schedule();
                return;
            }
        }
    }
}

// ── Runtime ──────────────────────────────────────────────────

/// Owns the executor, the shared controller and the alarm task handle.
pub struct Runtime<'a, S, H, C> {
    executor: LocalExecutor<'a, MAX_TASKS>,
    ctx: Shared<S, H, C>,
    timing: Timing,
    alarm: RefCell<Option<Task<()>>>,
}

impl<'a, S, H, C> Runtime<'a, S, H, C>
where
    S: SensorPort + 'a,
    H: HeaterPort + 'a,
    C: ClockPort + 'a,
{
    pub fn new(controller: Controller<S, H, C>, timing: Timing) -> Self {
        Self {
            executor: LocalExecutor::new(),
            ctx: Rc::new(RefCell::new(controller)),
            timing,
            alarm: RefCell::new(None),
        }
    }

    pub fn controller(&self) -> &Shared<S, H, C> {
        &self.ctx
    }

    /// Spawn the decode, sampling, control and button tasks.
    pub fn spawn_services<D, P>(&self, display: D, button: P)
    where
        D: DisplayPort + 'a,
        P: InputPin + 'a,
    {
        self.executor.spawn(decode_task(self.ctx.clone())).detach();
        self.executor
            .spawn(sampling_task(self.ctx.clone(), display, self.timing))
            .detach();
        self.executor
            .spawn(control_task(self.ctx.clone(), self.timing))
            .detach();
        self.executor
            .spawn(button_task(self.ctx.clone(), button, self.timing))
            .detach();
        info!("runtime: decode, sampling, control and button tasks started");
    }

    /// Spawn the software PWM loop for the heater.
    pub fn spawn_heater<P: OutputPin + 'a>(&self, pwm: Rc<SoftPwm<P>>) {
        self.executor
            .spawn(async move {
                pwm.run().await;
                info!("heater: PWM task ended");
            })
            .detach();
    }

    /// Install, replace or cancel (`None` / empty) the power-on time.
    ///
    /// The new schedule is planned first; on error the pending alarm and
    /// its task are left as they were.  Otherwise the previous alarm task
    /// is cancelled and awaited before the new one is spawned.  Returns
    /// the installed time as `HH:MM`.
    pub async fn schedule_power_on(
        &self,
        at: Option<&str>,
    ) -> Result<Option<String>, ScheduleError> {
        let at = match at.map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(s.parse::<TimeOfDay>()?),
        };

        let installed = self.ctx.borrow_mut().set_schedule(at)?;

        let previous = self.alarm.borrow_mut().take();
        if let Some(task) = previous {
            task.cancel().await;
        }

        if installed.is_some() {
            let task = self.executor.spawn(alarm_task(self.ctx.clone()));
            *self.alarm.borrow_mut() = Some(task);
        }
        Ok(installed.map(|t| t.to_string()))
    }

    pub fn alarm_pending(&self) -> bool {
        self.alarm
            .borrow()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Force the controller OFF for good and stop the heater PWM.
    pub async fn shut_down(&self) {
        let previous = self.alarm.borrow_mut().take();
        if let Some(task) = previous {
            task.cancel().await;
        }
        self.ctx.borrow_mut().shut_down();
        warn!("runtime: shut down");
    }

    /// Drive every spawned task until `fut` completes.
    pub async fn run<T>(&self, fut: impl Future<Output = T>) -> T {
        self.executor.run(fut).await
    }
}
