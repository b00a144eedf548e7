//! Exit codes of the `benchlog` binary. Part of the public contract.

pub const SUCCESS: i32 = 0;
pub const WARNINGS: i32 = 1; // Diagnostics present under --deny-warnings
pub const CONFIG_ERROR: i32 = 2; // Bad config or input, empty dataset, fatal diagnostic
