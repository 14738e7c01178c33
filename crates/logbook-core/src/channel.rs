//! The outbound half of the messaging platform, as the engine sees it.

use crate::render::Screen;
use async_trait::async_trait;
use thiserror::Error;

/// Failure putting a screen on the channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("send failed: {0}")]
    Send(String),
    #[error("edit failed: {0}")]
    Edit(String),
}

/// Renders screens to the end user. Single attempt per operation;
/// transport retry policy is out of scope here.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Post the screen as a new message.
    async fn reply(&self, screen: &Screen) -> Result<(), ChannelError>;

    /// Rewrite the message the triggering button tap came from.
    /// Implementations fall back to [`Channel::reply`] when there is no
    /// editable message.
    async fn edit_in_place(&self, screen: &Screen) -> Result<(), ChannelError>;
}
