//! CLI command implementations

mod batch;
mod lookup;

pub use batch::batch;
pub use lookup::lookup;
