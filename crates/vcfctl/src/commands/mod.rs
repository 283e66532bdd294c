pub mod profile;
pub mod task;
