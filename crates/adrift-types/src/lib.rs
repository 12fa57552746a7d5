pub mod api;
pub mod models;

pub use models::{Area, BlessCurse, Bottle, Kind, Memorial, Reply};
