// lib.rs - client-side core: task store, suggestions, chat, session and offline cache
pub mod api_client;
pub mod chat;
pub mod error;
pub mod offline_cache;
pub mod session;
pub mod suggestion;
pub mod sync;
pub mod tasks;

// Re-export commonly used types for convenience
pub use api_client::{ApiClient, ClientConfig};
pub use chat::{ChatMessage, ChatRole, ChatService};
pub use error::{AppError, Result};
pub use session::{AuthSession, Session, User, UserRole};
pub use suggestion::{suggest, Suggestion};
pub use sync::TaskSync;
pub use tasks::{Task, TaskStore, TaskViews};
