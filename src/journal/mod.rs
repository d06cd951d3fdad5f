//! Journal module - journaling conversations, daily summaries and sweeps.

pub mod analysis;
pub mod database;
pub mod debounce;
pub mod engine;
pub mod gateway;
pub mod gemini;
pub mod prompts;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod sweeps;
pub mod telegram;
pub mod throttle;
pub mod user_key;

#[cfg(test)]
mod testing;

pub use database::Database;
pub use engine::Journal;
pub use gemini::GeminiClient;
pub use scheduler::{Scheduler, SweepHours};
pub use sweeps::{SweepSettings, Sweeper};
pub use telegram::TelegramClient;
pub use user_key::UserKey;
