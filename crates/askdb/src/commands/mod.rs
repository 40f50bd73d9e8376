//! Command implementations that touch the workspace layout.

pub mod init;
