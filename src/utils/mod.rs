pub mod signal;
pub mod uploads;
pub mod validation;
