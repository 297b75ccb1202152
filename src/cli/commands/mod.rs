pub mod init;
pub mod roles;
pub mod sync;
pub mod token;
