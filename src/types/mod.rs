pub mod backlog;
pub mod devops;
pub mod project;
