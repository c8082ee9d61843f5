pub mod task;
pub mod user;

pub use task::{
    CreateTaskInput, PageRequest, StatusInput, Task, TaskFilter, TaskListQuery, UpdateTaskInput,
};
pub use user::{LoginRequest, RegisterRequest, UpdateUserRequest, User, UserProfile};
