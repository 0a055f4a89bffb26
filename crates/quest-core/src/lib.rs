pub mod approval;
pub mod config;
pub mod error;
pub mod finalize;
pub mod hierarchy;
pub mod io;
pub mod oracle;
pub mod paths;
pub mod planner;
pub mod quest;
pub mod session;
pub mod store;
pub mod ticket;
pub mod tracker;
pub mod tree;
pub mod types;

pub use error::{QuestError, Result};
