//! JSON request dispatch for the web front-end.
//!
//! Maps a request path and its JSON body onto the controller operations
//! and returns the JSON document to send back.  HTTP framing is the
//! server's business; every path answers with a value, never an error.
//!
//! | Path              | Body                         | Response                |
//! |-------------------|------------------------------|-------------------------|
//! | `/power`          | `{"power": "on"/"off"/bool}` | message                 |
//! | `/mode`           | `{"mode": "espresso"}`       | message                 |
//! | `/status`         | `{"interval": any}`          | status report           |
//! | `/settings`       | —                            | settings document       |
//! | `/save_settings`  | settings document            | message                 |
//! | `/history`        | —                            | history report          |
//! | `/schedule_alarm` | `{"alarm_time", "current_time"}` | `"HH:MM"` or `null` |
//!
//! An alarm request that carries `current_time` steps the wall clock to
//! it before the alarm is planned.

use log::warn;
use serde::Serialize;
use serde_json::{Value, json};

use crate::config::{Mode, Settings};
use crate::error::Result;
use crate::scheduler::ClientTime;

use super::ports::{ClockPort, ConfigPort, HeaterPort, SensorPort};
use super::runtime::Runtime;

pub const UNKNOWN_PATH: &str = "this path doesn't exist";
pub const SETTINGS_SAVED: &str = "Settings saved";
pub const SETTINGS_NOT_SAVED: &str = "Failed to save settings";

fn to_json(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn bad_request(path: &str, what: &str) -> Value {
    warn!("api {}: {}", path, what);
    Value::String(format!("Invalid request: {what}"))
}

/// `"on"`, `"off"`, `true` or `false`.
fn parse_power(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(on) => Some(*on),
        Value::String(s) if s.eq_ignore_ascii_case("on") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("off") => Some(false),
        _ => None,
    }
}

/// Sync the wall clock from the client, then install or cancel the alarm.
async fn schedule_alarm<'a, S, H, C>(
    rt: &Runtime<'a, S, H, C>,
    body: &Value,
) -> Result<Option<String>>
where
    S: SensorPort + 'a,
    H: HeaterPort + 'a,
    C: ClockPort + 'a,
{
    let alarm = body["alarm_time"].as_str().filter(|s| !s.trim().is_empty());
    if let (Some(_), Some(now)) = (alarm, body["current_time"].as_str()) {
        let now = now.parse::<ClientTime>()?;
        rt.controller().borrow_mut().sync_wall_clock(now)?;
    }
    Ok(rt.schedule_power_on(alarm).await?)
}

pub async fn dispatch<'a, S, H, C>(
    rt: &Runtime<'a, S, H, C>,
    store: &impl ConfigPort,
    path: &str,
    body: &Value,
) -> Value
where
    S: SensorPort + 'a,
    H: HeaterPort + 'a,
    C: ClockPort + 'a,
{
    let ctx = rt.controller();
    match path {
        "/power" => match parse_power(&body["power"]) {
            Some(on) => Value::String(ctx.borrow_mut().power(on)),
            None => bad_request(path, "power must be on or off"),
        },
        "/mode" => match body["mode"].as_str().map(str::parse::<Mode>) {
            Some(Ok(mode)) => Value::String(ctx.borrow_mut().set_mode(mode)),
            _ => bad_request(path, "unknown mode"),
        },
        "/status" => to_json(ctx.borrow().get_status(body["interval"].clone())),
        "/settings" => to_json(ctx.borrow().get_settings()),
        "/save_settings" => {
            let saved = serde_json::from_value::<Settings>(body.clone())
                .map_err(|e| warn!("api {}: {}", path, e))
                .ok()
                .and_then(|settings| ctx.borrow_mut().save_settings(settings, store).ok());
            json!(if saved.is_some() { SETTINGS_SAVED } else { SETTINGS_NOT_SAVED })
        }
        "/history" => to_json(ctx.borrow().get_history()),
        "/schedule_alarm" => match schedule_alarm(rt, body).await {
            Ok(at) => to_json(at),
            Err(e) => bad_request(path, &e.to_string()),
        },
        _ => Value::String(UNKNOWN_PATH.into()),
    }
}
