//! Concrete upstream providers.
//!
//! `DeepInfra` serves chat and translation, Stability AI serves text-to-image.

mod deepinfra;
mod stability;

pub use deepinfra::DeepInfraProvider;
pub use stability::StabilityProvider;
