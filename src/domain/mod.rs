pub mod chain;
pub mod credits;
pub mod history;
pub mod session;
pub mod workflow;
