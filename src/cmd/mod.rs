//! CLI command implementations.
//!
//! | Module     | Commands handled |
//! |------------|------------------|
//! | `phases`   | `Phases`         |
//! | `simulate` | `Simulate`       |
//! | `inspect`  | `Inspect`        |
//! | `config`   | `Config`         |

pub mod config;
pub mod inspect;
pub mod phases;
pub mod simulate;

pub use config::cmd_config;
pub use inspect::cmd_inspect;
pub use phases::cmd_phases;
pub use simulate::cmd_simulate;
