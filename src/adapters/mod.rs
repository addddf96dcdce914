//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements             | Connects to              |
//! |------------|------------------------|--------------------------|
//! | `display`  | DisplayPort            | Serial log output        |
//! | `hardware` | SensorLine, HAL pins   | ESP32 GPIO, edge ISR     |
//! | `nvs`      | ConfigPort             | NVS / in-memory store    |
//! | `time`     | ClockPort              | esp_timer, system clock  |

pub mod display;
pub mod hardware;
pub mod nvs;
pub mod time;
