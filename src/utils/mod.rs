/// File utilities
pub mod files;

/// Hugging Face utilities
pub mod hugging_face;

/// Insertion-ordered string maps
pub mod ordered;

pub use ordered::OrderedMap;
