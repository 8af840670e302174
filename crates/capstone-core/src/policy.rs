//! Permission predicates.
//!
//! Each operation's authorization rule is a pure function of
//! `(role, actor uid, target document)` returning `Ok(())` or a typed
//! [`Denial`], so the rules can be unit-tested without a store. Handlers
//! translate a `Denial` into the `permission-denied` wire error.

use thiserror::Error;

use crate::model::{ChatbotInteraction, FileMetadata, Notification, Project, Role};

/// A typed authorization denial with a human-readable reason.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct Denial {
    pub reason: String,
}

impl Denial {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<Denial> for crate::error::ApiError {
    fn from(denial: Denial) -> Self {
        crate::error::ApiError::PermissionDenied(denial.reason)
    }
}

type Verdict = Result<(), Denial>;

/// Create a user with an explicit role: admin or coordinator.
pub fn can_create_user(actor_role: Role) -> Verdict {
    if actor_role.can_manage_users() {
        Ok(())
    } else {
        Err(Denial::new("Only admins and coordinators may create users"))
    }
}

/// Change a user's role or delete a user: admin only.
pub fn can_administer_users(actor_role: Role) -> Verdict {
    if actor_role == Role::Admin {
        Ok(())
    } else {
        Err(Denial::new("Only admins may modify or delete users"))
    }
}

/// Create a project: students only (the caller becomes the owner).
pub fn can_create_project(actor_role: Role) -> Verdict {
    if actor_role == Role::Student {
        Ok(())
    } else {
        Err(Denial::new("Only students may create projects"))
    }
}

/// Update a project: its student, its supervisor, admin or coordinator.
pub fn can_update_project(actor_role: Role, actor_uid: &str, project: &Project) -> Verdict {
    if project.is_member(actor_uid) || matches!(actor_role, Role::Admin | Role::Coordinator) {
        Ok(())
    } else {
        Err(Denial::new("Not a member of this project"))
    }
}

/// Delete a project: the owning student or an admin.
pub fn can_delete_project(actor_role: Role, actor_uid: &str, project: &Project) -> Verdict {
    if project.student_id == actor_uid || actor_role == Role::Admin {
        Ok(())
    } else {
        Err(Denial::new("Only the owning student or an admin may delete a project"))
    }
}

/// Message a project or update its milestones: student or supervisor of
/// that project, regardless of role elsewhere.
pub fn can_act_on_project(actor_uid: &str, project: &Project) -> Verdict {
    if project.is_member(actor_uid) {
        Ok(())
    } else {
        Err(Denial::new("Not a member of this project"))
    }
}

/// Send a single notification: admin, coordinator or supervisor.
pub fn can_send_notification(actor_role: Role) -> Verdict {
    if matches!(actor_role, Role::Admin | Role::Coordinator | Role::Supervisor) {
        Ok(())
    } else {
        Err(Denial::new("Students may not send notifications"))
    }
}

/// Send a bulk notification: admin or coordinator only.
pub fn can_send_bulk_notification(actor_role: Role) -> Verdict {
    if matches!(actor_role, Role::Admin | Role::Coordinator) {
        Ok(())
    } else {
        Err(Denial::new("Only admins and coordinators may send bulk notifications"))
    }
}

/// Rate or delete a chatbot interaction: its creator only.
pub fn can_modify_interaction(actor_uid: &str, interaction: &ChatbotInteraction) -> Verdict {
    if interaction.user_id == actor_uid {
        Ok(())
    } else {
        Err(Denial::new("Only the interaction's creator may modify it"))
    }
}

/// Delete a file: its uploader or an admin.
pub fn can_delete_file(actor_role: Role, actor_uid: &str, file: &FileMetadata) -> Verdict {
    if file.uploaded_by == actor_uid || actor_role == Role::Admin {
        Ok(())
    } else {
        Err(Denial::new("Only the uploader or an admin may delete a file"))
    }
}

/// List a project's files: project members plus admin/coordinator.
pub fn can_view_project_files(actor_role: Role, actor_uid: &str, project: &Project) -> Verdict {
    if project.is_member(actor_uid) || matches!(actor_role, Role::Admin | Role::Coordinator) {
        Ok(())
    } else {
        Err(Denial::new("Not a member of this project"))
    }
}

/// Confirm an upload: its uploader only.
pub fn can_confirm_upload(actor_uid: &str, file: &FileMetadata) -> Verdict {
    if file.uploaded_by == actor_uid {
        Ok(())
    } else {
        Err(Denial::new("Only the uploader may confirm an upload"))
    }
}

/// Mark a notification as read: its recipient only.
pub fn can_mark_notification_read(actor_uid: &str, notification: &Notification) -> Verdict {
    if notification.user_id == actor_uid {
        Ok(())
    } else {
        Err(Denial::new(
            "Only the recipient may mark a notification as read",
        ))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::ProjectStatus;

    fn project(student: &str, supervisor: &str) -> Project {
        Project {
            id: "p1".into(),
            title: "Thesis".into(),
            description: None,
            student_id: student.into(),
            supervisor_id: supervisor.into(),
            status: ProjectStatus::Planning,
            timeline: vec![],
            progress: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_management_predicates() {
        assert!(can_create_user(Role::Admin).is_ok());
        assert!(can_create_user(Role::Coordinator).is_ok());
        assert!(can_create_user(Role::Supervisor).is_err());
        assert!(can_create_user(Role::Student).is_err());

        assert!(can_administer_users(Role::Admin).is_ok());
        assert!(can_administer_users(Role::Coordinator).is_err());
    }

    #[test]
    fn test_only_students_create_projects() {
        assert!(can_create_project(Role::Student).is_ok());
        for role in [Role::Supervisor, Role::Coordinator, Role::Admin] {
            assert!(can_create_project(role).is_err());
        }
    }

    #[test]
    fn test_project_update_and_delete() {
        let p = project("s1", "sup1");

        assert!(can_update_project(Role::Student, "s1", &p).is_ok());
        assert!(can_update_project(Role::Supervisor, "sup1", &p).is_ok());
        assert!(can_update_project(Role::Admin, "nobody", &p).is_ok());
        assert!(can_update_project(Role::Coordinator, "nobody", &p).is_ok());
        assert!(can_update_project(Role::Student, "other-student", &p).is_err());

        assert!(can_delete_project(Role::Student, "s1", &p).is_ok());
        assert!(can_delete_project(Role::Admin, "nobody", &p).is_ok());
        // The supervisor may update but not delete.
        assert!(can_delete_project(Role::Supervisor, "sup1", &p).is_err());
        assert!(can_delete_project(Role::Coordinator, "nobody", &p).is_err());
    }

    #[test]
    fn test_project_membership_actions() {
        let p = project("s1", "sup1");
        assert!(can_act_on_project("s1", &p).is_ok());
        assert!(can_act_on_project("sup1", &p).is_ok());
        assert!(can_act_on_project("s2", &p).is_err());
    }

    #[test]
    fn test_notification_predicates() {
        assert!(can_send_notification(Role::Supervisor).is_ok());
        assert!(can_send_notification(Role::Student).is_err());

        assert!(can_send_bulk_notification(Role::Coordinator).is_ok());
        assert!(can_send_bulk_notification(Role::Supervisor).is_err());

        let notification = Notification {
            id: "n1".into(),
            user_id: "u1".into(),
            title: "t".into(),
            message: "m".into(),
            kind: Default::default(),
            read: false,
            created_at: Utc::now(),
        };
        assert!(can_mark_notification_read("u1", &notification).is_ok());
        assert!(can_mark_notification_read("u2", &notification).is_err());
    }

    #[test]
    fn test_interaction_creator_only() {
        let interaction = ChatbotInteraction {
            id: "c1".into(),
            user_id: "u1".into(),
            query: "q".into(),
            response: "r".into(),
            language: Default::default(),
            rating: None,
            feedback: None,
            context: None,
            created_at: Utc::now(),
        };

        assert!(can_modify_interaction("u1", &interaction).is_ok());
        assert!(can_modify_interaction("u2", &interaction).is_err());
    }

    #[test]
    fn test_file_predicates() {
        let file = FileMetadata {
            id: "f1".into(),
            name: "report.pdf".into(),
            size: 10,
            content_type: "application/pdf".into(),
            uploaded_by: "u1".into(),
            project_id: None,
            url: None,
            created_at: Utc::now(),
        };

        assert!(can_delete_file(Role::Student, "u1", &file).is_ok());
        assert!(can_delete_file(Role::Admin, "someone-else", &file).is_ok());
        assert!(can_delete_file(Role::Supervisor, "someone-else", &file).is_err());

        // Confirming is stricter than deleting: even an admin may not
        // confirm someone else's upload.
        assert!(can_confirm_upload("u1", &file).is_ok());
        assert!(can_confirm_upload("someone-else", &file).is_err());

        let p = project("s1", "sup1");
        assert!(can_view_project_files(Role::Student, "s1", &p).is_ok());
        assert!(can_view_project_files(Role::Coordinator, "nobody", &p).is_ok());
        assert!(can_view_project_files(Role::Student, "s2", &p).is_err());
    }
}
