//! Business operations shared by the HTTP handlers.

pub mod tasks;
pub mod users;

pub use tasks::TaskService;
pub use users::UserService;
