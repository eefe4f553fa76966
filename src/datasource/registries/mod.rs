//! Registry implementations for fetching package releases

pub mod devbox;

pub use devbox::DevboxRegistry;
