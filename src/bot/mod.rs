/// Per-chat send/edit/upload operations
pub mod channel;
/// Bot-wide operations (webhook management)
pub mod gateway;
/// Command parsing and routing
pub mod handlers;
/// Long-polling runtime
pub mod runner;

pub use channel::{ConversationChannel, TelegramChannel};
pub use gateway::{BotGateway, TelegramGateway};
pub use handlers::CommandRouter;
