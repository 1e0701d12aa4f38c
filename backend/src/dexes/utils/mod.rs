pub mod dex_utils;

pub use dex_utils::*;
