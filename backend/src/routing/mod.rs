// Token normalization and router path construction
pub mod path;

pub use path::{Normalized, PathBuilder, NATIVE_SENTINEL};
