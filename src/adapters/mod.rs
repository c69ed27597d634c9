// Adapters layer: concrete implementations of the domain ports.

pub mod gpm;

pub use gpm::GpmClient;
