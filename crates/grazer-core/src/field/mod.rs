//! Potential-field steering
//!
//! [`ForceModel`] turns one tick's detections into a single steering vector and
//! [`DetectionRadius`] carries the only state that survives between ticks.

pub mod force;
pub mod radius;

pub use force::{BorderConfig, EdgeRepulsion, FieldInput, FieldReport, ForceConfig, ForceModel, ForceTerms};
pub use radius::{DetectionRadius, RadiusConfig};
