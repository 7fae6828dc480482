pub mod common;
pub mod fixed;
pub mod read;
pub mod write;
