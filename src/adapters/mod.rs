//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter   | Implements                        | Connects to               |
//! |-----------|-----------------------------------|---------------------------|
//! | `sim`     | Routing, Radio, Sensor, Actuator, | In-memory collaborators   |
//! |           | Indicator, System ports           | (dump sensors, LED pins)  |
//! | `udp`     | NetworkPort                       | Query socket, alert queue |
//! | `logging` | (log backend)                     | tracing-subscriber fmt    |

#[cfg(feature = "host")]
pub mod logging;
pub mod sim;
pub mod udp;
