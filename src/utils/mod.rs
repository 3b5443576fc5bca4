pub mod constants;
pub mod logging;
pub mod parse;
pub mod progress;

pub use constants::*;
pub use logging::init_logging;
pub use parse::{normalize_missing, parse_integer, parse_timestamp, truncate_chars};
pub use progress::ProgressReporter;
