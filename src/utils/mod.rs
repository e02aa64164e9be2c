pub mod logging;

pub use logging::{init_log_file, log_startup, print_final_stats, RunStats};
