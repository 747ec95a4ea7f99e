pub mod analyze;
pub mod batch;
pub mod config;
pub mod health;
pub mod init;
pub mod serve;
pub mod usage;
