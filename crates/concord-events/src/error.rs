use concord_protocol::ChannelName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("event channel hub is closed")]
    Closed,

    #[error("malformed payload on {channel}: {source}")]
    Decode {
        channel: ChannelName,
        #[source]
        source: serde_json::Error,
    },
}
