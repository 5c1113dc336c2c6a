pub mod config;
pub mod logging;

pub mod clock;
pub mod interval;
pub mod request;
pub mod retry;
pub mod throttle;
pub mod transport;
