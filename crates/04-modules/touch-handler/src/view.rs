use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Opaque handle to a host view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(pub u64);

/// Read-only view hierarchy used to resolve touch targets.
pub trait ViewTree {
    fn parent(&self, view: ViewId) -> Option<ViewId>;

    /// React tag of a view managed by the worker, if any.
    fn react_tag(&self, view: ViewId) -> Option<u64>;

    fn is_touchable(&self, view: ViewId) -> bool;
}

#[derive(Clone, Copy, Debug)]
struct ViewNode {
    parent: Option<ViewId>,
    react_tag: Option<u64>,
    touchable: bool,
}

/// Map-backed [`ViewTree`].
#[derive(Clone, Debug, Default)]
pub struct SimpleViewTree {
    nodes: HashMap<ViewId, ViewNode>,
}

impl SimpleViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        view: ViewId,
        parent: Option<ViewId>,
        react_tag: Option<u64>,
        touchable: bool,
    ) -> &mut Self {
        self.nodes.insert(
            view,
            ViewNode {
                parent,
                react_tag,
                touchable,
            },
        );
        self
    }

    pub fn remove(&mut self, view: ViewId) -> bool {
        self.nodes.remove(&view).is_some()
    }

    pub fn contains(&self, view: ViewId) -> bool {
        self.nodes.contains_key(&view)
    }
}

impl ViewTree for SimpleViewTree {
    fn parent(&self, view: ViewId) -> Option<ViewId> {
        self.nodes.get(&view).and_then(|node| node.parent)
    }

    fn react_tag(&self, view: ViewId) -> Option<u64> {
        self.nodes.get(&view).and_then(|node| node.react_tag)
    }

    fn is_touchable(&self, view: ViewId) -> bool {
        self.nodes.get(&view).map_or(false, |node| node.touchable)
    }
}
