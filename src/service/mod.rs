pub mod backlog;
pub mod period;
pub mod projects;
pub mod wiql;
