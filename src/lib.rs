// Crate root library declaration and module exports.
pub mod cli;
pub mod config;
pub mod context;
pub mod model;
pub mod notify;
pub mod reschedule;
pub mod scanner;
pub mod store;
pub mod system;
