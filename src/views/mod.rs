pub mod health;
pub mod issues;
pub mod reports;
pub mod sprints;
pub mod utils;
