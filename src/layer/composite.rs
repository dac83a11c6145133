//! Composite behaviors and the child handle they operate through.

use super::leaf::MapView;
use super::node::{AsAny, LayerId, LayerNode, LayerSettings};
use super::tree::LayerTree;
use super::LayerError;
use crate::query::{Crs, FeatureQuery};

/// Extra behavior attached to a composite layer.
///
/// Hooks run before the composite recurses into its children, so a behavior
/// can add or drop children that the same pass then visits. Hit testing and
/// enumeration always use the plain composite traversal.
pub trait CompositeBehavior: AsAny {
    /// Called while the composite is active for `query`.
    fn prepare(&mut self, _children: &mut Children<'_>, _crs: Crs, _query: &FeatureQuery) {}

    /// Called while the composite is enabled.
    fn update(&mut self, _children: &mut Children<'_>, _view: &MapView) {}
}

/// Mutable access to one composite's direct children.
///
/// Handed to [`CompositeBehavior`] hooks. Operations are restricted to the
/// composite's own children so a behavior cannot reach elsewhere in the tree.
pub struct Children<'t> {
    tree: &'t mut LayerTree,
    parent: LayerId,
}

impl<'t> Children<'t> {
    pub(crate) fn new(tree: &'t mut LayerTree, parent: LayerId) -> Self {
        Self { tree, parent }
    }

    /// The composite these children belong to.
    pub fn parent(&self) -> LayerId {
        self.parent
    }

    /// Settings of the composite itself.
    pub fn settings(&self) -> Option<&LayerSettings> {
        self.tree.settings(self.parent)
    }

    /// Child ids in order.
    pub fn ids(&self) -> &[LayerId] {
        self.tree.children(self.parent)
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    /// Append a new child.
    pub fn insert(&mut self, node: LayerNode) -> Result<LayerId, LayerError> {
        self.tree.insert(self.parent, node)
    }

    /// Remove a child and its subtree.
    pub fn remove(&mut self, child: LayerId) -> Result<LayerNode, LayerError> {
        self.check_child(child)?;
        self.tree.remove(child)
    }

    pub fn get(&self, child: LayerId) -> Option<&LayerNode> {
        self.check_child(child).ok()?;
        self.tree.get(child)
    }

    pub fn get_mut(&mut self, child: LayerId) -> Option<&mut LayerNode> {
        self.check_child(child).ok()?;
        self.tree.get_mut(child)
    }

    fn check_child(&self, child: LayerId) -> Result<(), LayerError> {
        if self.tree.parent(child) == Some(self.parent) {
            Ok(())
        } else {
            Err(LayerError::NotAChild {
                parent: self.parent,
                child,
            })
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
