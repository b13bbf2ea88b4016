//! Lifecycle event transport.
//!
//! [`ChannelEventSink`] encodes events as JSON onto an `async_channel`;
//! [`EventConsumer`] drains the other end, the way a broker consumer process would.
//! [`FanoutSink`] publishes one event to several sinks.

mod channel_sink;
mod consumer;
mod fanout_sink;

pub use channel_sink::ChannelEventSink;
pub use consumer::{ConsumerStats, EventConsumer};
pub use fanout_sink::FanoutSink;
