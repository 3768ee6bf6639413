//! Multi-layer compositing.
//!
//! [`LayerStack`] walks every output pixel across a prioritized stack
//! of elevation layers, picks the winning base sample, folds additive
//! offset layers on top, and finishes with a fallback-aware normal map.

mod normal;
mod stack;

pub use normal::build_normal_map;
pub use stack::LayerStack;
