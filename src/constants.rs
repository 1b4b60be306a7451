// src/constants.rs

/// Default number of capability objects the construction cache retains.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Environment variable overriding the construction cache capacity (0 disables it).
pub const CACHE_CAPACITY_ENV: &str = "CAPBIND_CACHE_CAPACITY";

/// Environment variable selecting the shape policy (`any` or `reject-narrowing`).
pub const SHAPE_POLICY_ENV: &str = "CAPBIND_SHAPE_POLICY";

/// File name of the debug log written to the temp directory by the CLI.
pub const LOG_FILE_NAME: &str = "capbind.log";
