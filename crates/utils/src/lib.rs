pub mod error;
#[cfg(feature = "full")]
pub mod settings;
#[cfg(feature = "full")]
pub mod signature;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
