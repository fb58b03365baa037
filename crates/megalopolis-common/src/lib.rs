pub mod access_log;
pub mod exec;
pub mod json;
pub mod shutdown;
pub mod telemetry;
pub mod time;

pub use exec::{run_with_timeout, spawn_detached, CommandOutput, ExecError};
pub use json::{ErrorBody, PrettyJson};
pub use time::utc_timestamp;
