pub mod linalg;

pub use linalg::*;
