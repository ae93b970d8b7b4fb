pub mod agent;
pub mod onboard;
pub mod progress;
