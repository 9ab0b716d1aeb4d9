pub mod archive;
pub mod error;
pub mod fmi2;
pub mod model;
pub mod platform;
pub mod sim;

pub use error::{ErrorKind, FmuError, Result};

#[cfg(test)]
mod test;
