//! Domain models for the fishing forecast and alert engine

mod alert;
mod conditions;
mod forecast;
mod tide;

pub use alert::*;
pub use conditions::*;
pub use forecast::*;
pub use tide::*;
