//! process exit codes
//!
//! JSON error envelopes carry the same code offset into the JSON-RPC server
//! range, so scripts can branch on either.

pub const SUCCESS: i32 = 0;

/// anything not covered below, including usage errors
pub const ERROR: i32 = 1;

/// `--input` file missing or unreadable
pub const INPUT_NOT_FOUND: i32 = 2;

/// conditions file missing, malformed, or invalid
pub const CONFIG_ERROR: i32 = 5;

/// a replayed line could not be applied or evaluated
pub const EVALUATION_ERROR: i32 = 8;
