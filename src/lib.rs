pub mod error;
pub mod bits;
pub mod window;
pub mod frequency;
pub mod codec;
pub mod entropy;
pub mod stats;
pub mod pipeline;
pub mod render;
pub mod cap;
