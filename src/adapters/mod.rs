//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements    | Connects to                    |
//! |---------------|---------------|--------------------------------|
//! | `config_file` | ConfigPort    | JSON file on disk              |
//! | `log_sink`    | EventSink     | `log` output (operator display)|
//! | `modbus`      | RegisterPort  | Modbus/TCP field device        |
//! | `sim`         | RegisterPort  | In-memory tank model           |
//! | `time`        | ClockPort     | `std::time::Instant`           |

pub mod config_file;
pub mod log_sink;
#[cfg(feature = "modbus")]
pub mod modbus;
pub mod sim;
pub mod time;
