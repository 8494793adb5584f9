mod bus;
mod error;
mod runner;
mod subscriber;

pub use bus::{BroadcastHub, EventChannel, DEFAULT_CHANNEL_CAPACITY};
pub use error::ChannelError;
pub use runner::{HandlerRegistry, SubscriberRunner};
pub use subscriber::{ChannelEvent, EventHandler, Subscriber};
