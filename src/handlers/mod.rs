pub mod backlog;
pub mod docs;
pub mod projects;
pub mod root;
