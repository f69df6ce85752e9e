//! Common test infrastructure
//!
//! Builders for dump directories full of captured envelopes, and for the
//! payload shapes the upstream API returns. Tests should only import from
//! this module, not from internal submodules.

mod constants;
mod fixtures;

pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{history_item, read_csv, track_json, DumpDir};
