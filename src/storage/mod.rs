pub mod json;

pub use json::{load, save};
