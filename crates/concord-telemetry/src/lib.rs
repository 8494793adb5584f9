mod subscriber;

pub use subscriber::{build_filter, try_init_subscriber, TelemetryConfig};
