pub mod baas;
pub mod config;
pub mod media;
pub mod payments;
