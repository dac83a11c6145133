//! Time-driven feature animation.
//!
//! An [`Animation`] receives lifecycle hooks from the [`Animator`], which
//! advances every registered animation once per tick and resolves its target
//! feature through the layer tree. [`FeatureAnimation`] moves a feature along a
//! straight line and loops forever.

use std::time::Duration;

use slotmap::{new_key_type, SlotMap};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::feature::{Feature, FeatureKey};
use crate::geometry::Point;
use crate::layer::LayerTree;

// ---------------------------------------------------------------------------
// Easing
// ---------------------------------------------------------------------------

/// Maps normalised time to progress. Both are in `[0, 1]`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Easing {
    /// Progress at time `t`. `t` is clamped; NaN counts as the start.
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => t * (2.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Animation
// ---------------------------------------------------------------------------

/// What happens after an animation reaches the end of its duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationEnd {
    /// Start again at progress 0 on the next tick.
    Restart,
    /// Drop the animation.
    Remove,
}

/// Hooks driven by the [`Animator`].
pub trait Animation {
    /// The feature this animation mutates.
    fn target(&self) -> FeatureKey;

    fn duration(&self) -> Duration;

    fn easing(&self) -> Easing {
        Easing::Linear
    }

    /// Called once before the first update.
    fn on_started(&mut self, _feature: &mut Feature) {}

    /// Called every tick with the eased progress.
    fn on_updated(&mut self, progress: f64, feature: &mut Feature);

    /// Called when progress reaches 1.
    fn on_finished(&mut self, _feature: &mut Feature) -> AnimationEnd {
        AnimationEnd::Restart
    }
}

/// Moves a feature from `from` to `to` over `duration`, then starts over.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureAnimation {
    pub target: FeatureKey,
    pub from: Point,
    pub to: Point,
    pub duration: Duration,
    pub easing: Easing,
}

impl FeatureAnimation {
    pub fn new(target: FeatureKey, from: Point, to: Point, duration: Duration) -> Self {
        Self {
            target,
            from,
            to,
            duration,
            easing: Easing::Linear,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Position at `progress`.
    pub fn position_at(&self, progress: f64) -> Point {
        self.from + (self.to - self.from) * progress
    }
}

impl Animation for FeatureAnimation {
    fn target(&self) -> FeatureKey {
        self.target
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn easing(&self) -> Easing {
        self.easing
    }

    fn on_updated(&mut self, progress: f64, feature: &mut Feature) {
        feature.set_position(self.position_at(progress));
    }
}

// ---------------------------------------------------------------------------
// Animator
// ---------------------------------------------------------------------------

new_key_type! {
    /// Handle to an animation registered with an [`Animator`].
    pub struct AnimationId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Running,
    Restarting,
}

struct Entry {
    animation: Box<dyn Animation>,
    elapsed: Duration,
    phase: Phase,
}

/// Owns animations and advances them against a [`LayerTree`].
///
/// Cancelling is removal: an animation stops the moment it leaves the arena.
pub struct Animator {
    animations: SlotMap<AnimationId, Entry>,
}

impl Animator {
    pub fn new() -> Self {
        Self {
            animations: SlotMap::with_key(),
        }
    }

    pub fn add(&mut self, animation: impl Animation + 'static) -> AnimationId {
        let id = self.animations.insert(Entry {
            animation: Box::new(animation),
            elapsed: Duration::ZERO,
            phase: Phase::NotStarted,
        });
        debug!(?id, "animation added");
        id
    }

    /// Remove an animation. Returns whether it was registered.
    pub fn cancel(&mut self, id: AnimationId) -> bool {
        self.animations.remove(id).is_some()
    }

    pub fn contains(&self, id: AnimationId) -> bool {
        self.animations.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    /// Advance every animation by `delta`. Returns whether any animation ran.
    ///
    /// An animation whose feature no longer resolves is dropped.
    pub fn tick(&mut self, delta: Duration, tree: &mut LayerTree) -> bool {
        let mut finished = Vec::new();
        let mut ran = false;

        for (id, entry) in self.animations.iter_mut() {
            let key = entry.animation.target();
            let Some(feature) = tree.feature_mut(key) else {
                warn!(?id, ?key, "animated feature vanished, dropping animation");
                finished.push(id);
                continue;
            };
            ran = true;

            match entry.phase {
                Phase::NotStarted => {
                    entry.animation.on_started(feature);
                    entry.phase = Phase::Running;
                }
                Phase::Restarting => {
                    entry.elapsed = Duration::ZERO;
                    entry.phase = Phase::Running;
                    let progress = entry.animation.easing().apply(0.0);
                    entry.animation.on_updated(progress, feature);
                    continue;
                }
                Phase::Running => {}
            }

            entry.elapsed += delta;
            let duration = entry.animation.duration();
            let t = if duration.is_zero() {
                1.0
            } else {
                (entry.elapsed.as_secs_f64() / duration.as_secs_f64()).min(1.0)
            };
            let progress = entry.animation.easing().apply(t);
            entry.animation.on_updated(progress, feature);

            if t >= 1.0 {
                match entry.animation.on_finished(feature) {
                    AnimationEnd::Restart => entry.phase = Phase::Restarting,
                    AnimationEnd::Remove => finished.push(id),
                }
            }
        }

        for id in finished {
            self.animations.remove(id);
        }
        ran
    }
}

impl Default for Animator {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
