pub mod approve;
pub mod finalize;
pub mod init;
pub mod plan;
pub mod quest;
pub mod session;
pub mod ticket;
