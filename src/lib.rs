pub use qrstyle_core::*;
pub use qrstyle_render::*;
