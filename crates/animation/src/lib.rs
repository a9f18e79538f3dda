//! Value interpolation for scene properties.
//!
//! ```text
//! Animator
//!   ├── Tweens (one value from -> to, sampled once per tick)
//!   └── Keyframe runs (sequential segments of parallel tweens, repeated)
//! ```
//!
//! Nothing here owns a clock: the embedder calls [`Animator::tick`] once per
//! display refresh with a millisecond timestamp.

pub mod animator;
pub mod easing;
pub mod interpolate;
pub mod keyframes;

pub use animator::{Animator, CompleteFn, TweenId, TweenSpec, UpdateFn};
pub use easing::Easing;
pub use interpolate::{Animatable, lerp_array, lerp_number};
pub use keyframes::{
    IterationCount, KeyframePoint, KeyframeRunSpec, PropertyWriter, RunHandle, ValueSource,
};
