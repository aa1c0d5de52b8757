pub mod account;
pub mod lessons;
pub mod modules;
pub mod progress;
