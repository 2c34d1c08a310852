mod media_provider;

pub use media_provider::*;
