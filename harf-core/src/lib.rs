pub mod round;
pub mod scoring;
pub mod validate;

// Re-export main components
pub use round::*;
pub use scoring::*;
pub use validate::*;
