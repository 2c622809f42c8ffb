/// CLI Indexes: Training backends
pub mod backends;

pub use backends::Backend;
