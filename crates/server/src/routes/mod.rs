pub mod auth;
pub mod comments;
pub mod files;
pub mod message_context_files;
pub mod messages;
pub mod project_members;
pub mod projects;
pub mod tasks;
pub mod versions;
