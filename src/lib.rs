pub mod cli;
pub mod config;
pub mod diff;
pub mod locks;
pub mod model;
pub mod validate;

mod api;
mod flock;

pub use api::{Deplock, DeplockBuilder};
