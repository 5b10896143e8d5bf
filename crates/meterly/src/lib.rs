//! Top-level facade crate for meterly.
//!
//! Re-exports the core metric types and the server library so users can depend on a single crate.

pub mod core {
    pub use meterly_core::*;
}

pub mod server {
    pub use meterly_server::*;
}
