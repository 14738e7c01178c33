/// Telegram implementation of the engine channel
pub mod channel;
/// Inbound update-to-event mapping and commands
pub mod events;
