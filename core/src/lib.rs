//! Core types shared by the Xymon client crates: colors, server target and
//! client configuration.

pub mod color;
pub mod config;

pub use color::{Color, UnknownColor};
pub use config::{Target, XymonConfig};

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!version().is_empty());
    }
}
