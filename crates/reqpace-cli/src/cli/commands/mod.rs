//! CLI command handlers.

mod fetch;
mod intervals;

pub use fetch::{run_fetch, FetchArgs};
pub use intervals::{run_intervals, IntervalsCommand};

#[cfg(test)]
pub(crate) use fetch::{build_request, split_field};
#[cfg(test)]
pub(crate) use intervals::defined_in_config;
