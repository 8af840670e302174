mod enums;
mod models;

pub use enums::{ChatLanguage, MessageKind, NotificationKind, ProjectStatus, Role};
pub use models::{
    ChatbotInteraction, FileMetadata, Message, Milestone, Notification, Project, User,
};
