mod memory;
mod rest;
mod util;

pub use memory::*;
pub use rest::*;
