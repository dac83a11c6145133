//! Node types: LayerId, LayerSettings, LayerNode.

use std::any::Any;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use super::composite::CompositeBehavior;
use super::leaf::Layer;
use crate::query::ScaleRange;

new_key_type! {
    /// Unique identifier for a layer in a [`LayerTree`](super::LayerTree).
    pub struct LayerId;
}

// ---------------------------------------------------------------------------
// LayerSettings
// ---------------------------------------------------------------------------

/// Visibility and gating settings shared by every layer variant.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSettings {
    /// Display name, not required to be unique.
    pub name: String,
    /// Whether the layer participates in anything at all.
    pub enabled: bool,
    /// Whether the layer contributes to hit tests.
    pub selectable: bool,
    /// Whether the layer stays active while the view is moving.
    pub enabled_during_quick_updates: bool,
    /// Scales at which the layer is active.
    pub scale_range: ScaleRange,
    /// Whether the layer's drawable is handed to the renderer.
    pub rendering_enabled: bool,
}

impl LayerSettings {
    /// Settings with the given name and every flag on, full scale range.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            selectable: true,
            enabled_during_quick_updates: true,
            scale_range: ScaleRange::FULL,
            rendering_enabled: true,
        }
    }

    /// Set whether the layer is enabled (builder).
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set whether the layer is selectable (builder).
    pub fn selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    /// Set whether the layer stays active during quick updates (builder).
    pub fn enabled_during_quick_updates(mut self, enabled: bool) -> Self {
        self.enabled_during_quick_updates = enabled;
        self
    }

    /// Set the active scale range (builder).
    pub fn with_scale_range(mut self, range: ScaleRange) -> Self {
        self.scale_range = range;
        self
    }

    /// Set whether the drawable is rendered (builder).
    pub fn rendering_enabled(mut self, enabled: bool) -> Self {
        self.rendering_enabled = enabled;
        self
    }
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self::new("")
    }
}

// ---------------------------------------------------------------------------
// Drawable
// ---------------------------------------------------------------------------

/// Upcast to [`Any`] so trait objects stored in the tree can be downcast.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Opaque render state a layer hands to the rendering backend.
///
/// The core never inspects drawables; backends downcast to their own type.
pub trait Drawable: fmt::Debug + AsAny {}

// ---------------------------------------------------------------------------
// LayerNode
// ---------------------------------------------------------------------------

/// The variant-specific part of a layer.
pub enum LayerKind {
    /// A leaf with its own data.
    Leaf(Box<dyn Layer>),
    /// A composite. `None` is a plain layer set; `Some` carries a behavior
    /// such as tiling that runs before the children on prepare and update.
    Composite(Option<Box<dyn CompositeBehavior>>),
}

impl LayerKind {
    pub fn is_composite(&self) -> bool {
        matches!(self, LayerKind::Composite(_))
    }
}

impl fmt::Debug for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Leaf(_) => f.write_str("Leaf"),
            LayerKind::Composite(None) => f.write_str("Set"),
            LayerKind::Composite(Some(_)) => f.write_str("Composite"),
        }
    }
}

/// A single node in the layer tree.
#[derive(Debug)]
pub struct LayerNode {
    pub settings: LayerSettings,
    pub kind: LayerKind,
    pub drawable: Option<Box<dyn Drawable>>,
}

impl LayerNode {
    /// A leaf node.
    pub fn leaf(settings: LayerSettings, layer: impl Layer + 'static) -> Self {
        Self {
            settings,
            kind: LayerKind::Leaf(Box::new(layer)),
            drawable: None,
        }
    }

    /// A plain layer set.
    pub fn set(settings: LayerSettings) -> Self {
        Self {
            settings,
            kind: LayerKind::Composite(None),
            drawable: None,
        }
    }

    /// A composite with a behavior.
    pub fn composite(settings: LayerSettings, behavior: impl CompositeBehavior + 'static) -> Self {
        Self {
            settings,
            kind: LayerKind::Composite(Some(Box::new(behavior))),
            drawable: None,
        }
    }

    /// Attach a drawable (builder).
    pub fn with_drawable(mut self, drawable: impl Drawable) -> Self {
        self.drawable = Some(Box::new(drawable));
        self
    }
}

// ===========================================================================
// Tests
// ===========================================================================
