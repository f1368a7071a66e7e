pub mod attempt;
pub mod performance;
pub mod question;
pub mod quiz;
