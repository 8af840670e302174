pub mod auth;
pub mod chatbot;
pub mod config;
pub mod error;
pub mod model;
pub mod policy;
pub mod progress;

pub use auth::{AuthContext, Claims, ClaimsBuilder};
pub use config::AppConfig;
pub use error::{ApiError, Result};
pub use model::{
    ChatLanguage, ChatbotInteraction, FileMetadata, Message, MessageKind, Milestone, Notification,
    NotificationKind, Project, ProjectStatus, Role, User,
};
pub use policy::Denial;
pub use progress::{aggregate_progress, apply_milestone_patch, MilestonePatch};
