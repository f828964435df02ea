// Shelfmark services
// Services provide process-level concerns: settings persistence and logging.

pub mod logging;
pub mod settings_engine;
