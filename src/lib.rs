pub mod rx;
pub mod error;
pub mod config;

pub mod promise;
pub mod animation;
pub mod subscription;
pub mod rx_stream_ext;

// Re-export all items from rx module at the crate root
pub use rx::*;
pub use promise::{deferred, Deferred, Promise};
pub use animation::{animate, animate_each, AnimateStreamExt, Animator, TimedAnimator};
pub use subscription::{sink, sink_with_config, Subscription};
pub use rx_stream_ext::{IntoPublisher, OptionLike, PublisherExt};
pub use config::{AnimationConfig, SinkConfig};
pub use error::{StreamError, StreamResult};
