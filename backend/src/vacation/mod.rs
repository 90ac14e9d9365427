pub mod days;
pub mod engine;

pub use engine::{derive_effective_status, VacationEngine};
