pub mod cluster;
pub mod model;

pub use cluster::*;
pub use model::*;
