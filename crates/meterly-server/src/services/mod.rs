//! Demo endpoints the server instruments.

pub mod demo;

pub use demo::DelayedNoContent;
