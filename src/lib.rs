pub use dowser_core::*;
