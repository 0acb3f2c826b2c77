pub mod exceptions;
pub mod geometry;
mod node;
pub mod rtree;
#[cfg(feature = "setup_tracing")]
mod settings;
