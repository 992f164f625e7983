pub mod actions;
pub mod config;
pub mod init;
pub mod listen;
pub mod run;
pub mod status;
