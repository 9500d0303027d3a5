//! Response builders

pub mod media;
