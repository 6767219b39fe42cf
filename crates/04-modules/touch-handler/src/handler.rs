use std::collections::{HashMap, HashSet};

use crate::dispatcher::EventSink;
use crate::error::{TouchError, TouchResult};
use crate::event::{
    normalize_interaction, NativeTouch, RawInteraction, ReactTouch, TouchEvent, TouchPhase,
};
use crate::view::{ViewId, ViewTree};

/// Tracks active touches under one root view and reports their changes.
///
/// `native_touches`, `react_touches` and `touch_views` are parallel: index `i`
/// of each describes the same touch, and React sees touches by that index.
pub struct TouchHandler<S> {
    sink: S,
    root: Option<ViewId>,
    root_tag: Option<u64>,
    native_touches: Vec<NativeTouch>,
    react_touches: Vec<ReactTouch>,
    touch_views: Vec<ViewId>,
    by_identifier: HashMap<u32, usize>,
    coalescing_key: u16,
}

impl<S: EventSink> TouchHandler<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            root: None,
            root_tag: None,
            native_touches: Vec::new(),
            react_touches: Vec::new(),
            touch_views: Vec::new(),
            by_identifier: HashMap::new(),
            coalescing_key: 0,
        }
    }

    pub fn attach_to_view(&mut self, root: ViewId, tree: &dyn ViewTree) {
        self.root = Some(root);
        self.root_tag = tree.react_tag(root);
    }

    pub fn detach_from_view(&mut self) {
        self.root = None;
        self.root_tag = None;
    }

    pub fn root_view(&self) -> Option<ViewId> {
        self.root
    }

    /// Normalizes `raw` and feeds the resulting touches through `phase`.
    /// Returns false when the input produced no touches.
    pub fn handle_interaction(
        &mut self,
        phase: TouchPhase,
        raw: &RawInteraction,
        tree: &dyn ViewTree,
    ) -> TouchResult<bool> {
        let Some(touches) = normalize_interaction(raw)? else {
            return Ok(false);
        };
        match phase {
            TouchPhase::Start => self.touches_began(&touches, tree)?,
            TouchPhase::Move => self.touches_moved(&touches)?,
            TouchPhase::End => self.touches_ended(&touches)?,
        }
        Ok(true)
    }

    pub fn touches_began(
        &mut self,
        touches: &[NativeTouch],
        tree: &dyn ViewTree,
    ) -> TouchResult<()> {
        self.record_new_touches(touches, tree)?;
        self.update_and_dispatch(touches, TouchPhase::Start)
    }

    pub fn touches_moved(&mut self, touches: &[NativeTouch]) -> TouchResult<()> {
        self.update_and_dispatch(touches, TouchPhase::Move)
    }

    /// Reports the end and forgets the touches, even if reporting failed.
    pub fn touches_ended(&mut self, touches: &[NativeTouch]) -> TouchResult<()> {
        let sent = self.update_and_dispatch(touches, TouchPhase::End);
        self.record_removed_touches(touches);
        sent
    }

    pub fn active_touches(&self) -> usize {
        self.native_touches.len()
    }

    /// View each active touch resolved to, in touch index order.
    pub fn touch_views(&self) -> &[ViewId] {
        &self.touch_views
    }

    pub fn coalescing_key(&self) -> u16 {
        self.coalescing_key
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Records every touch or none of them.
    fn record_new_touches(
        &mut self,
        touches: &[NativeTouch],
        tree: &dyn ViewTree,
    ) -> TouchResult<()> {
        let mut incoming = HashSet::new();
        for touch in touches {
            if self.by_identifier.contains_key(&touch.identifier)
                || !incoming.insert(touch.identifier)
            {
                return Err(TouchError::DuplicateTouch(touch.identifier));
            }
        }
        let targets = touches
            .iter()
            .map(|touch| self.resolve_target(touch.view, tree))
            .collect::<TouchResult<Vec<_>>>()?;

        for (touch, target) in touches.iter().zip(targets) {
            self.by_identifier
                .insert(touch.identifier, self.native_touches.len());
            self.touch_views.push(target);
            self.native_touches.push(touch.clone());
            self.react_touches
                .push(ReactTouch::new(tree.react_tag(target), touch.identifier));
        }
        Ok(())
    }

    fn record_removed_touches(&mut self, touches: &[NativeTouch]) {
        let mut removed = false;
        for touch in touches {
            let Some(index) = self.by_identifier.remove(&touch.identifier) else {
                continue;
            };
            self.touch_views.remove(index);
            self.native_touches.remove(index);
            self.react_touches.remove(index);
            for slot in self.by_identifier.values_mut() {
                if *slot > index {
                    *slot -= 1;
                }
            }
            removed = true;
        }
        if removed {
            log::trace!("{} touches still active", self.native_touches.len());
        }
    }

    /// Nearest view that is the root or a touchable view known to React.
    fn resolve_target(&self, view: ViewId, tree: &dyn ViewTree) -> TouchResult<ViewId> {
        let mut current = Some(view);
        while let Some(candidate) = current {
            if Some(candidate) == self.root {
                return Ok(candidate);
            }
            if tree.react_tag(candidate).is_some() && tree.is_touchable(candidate) {
                return Ok(candidate);
            }
            current = tree.parent(candidate);
        }
        Err(TouchError::UnmanagedTarget(view))
    }

    fn update_and_dispatch(
        &mut self,
        touches: &[NativeTouch],
        phase: TouchPhase,
    ) -> TouchResult<()> {
        let mut changed_indexes = Vec::with_capacity(touches.len());
        for touch in touches {
            let Some(&index) = self.by_identifier.get(&touch.identifier) else {
                log::debug!("touch {} is not being tracked", touch.identifier);
                continue;
            };
            // The view stays the one the touch started on.
            let view = self.native_touches[index].view;
            self.native_touches[index] = NativeTouch {
                view,
                ..touch.clone()
            };
            self.react_touches[index].update_from(&self.native_touches[index]);
            changed_indexes.push(index);
        }

        if changed_indexes.is_empty() {
            log::debug!("no changed indexes for {}", phase.event_name());
            return Ok(());
        }
        if self.root.is_none() {
            return Err(TouchError::NoRootView);
        }

        let coalesce = phase.can_coalesce();
        if !coalesce {
            self.coalescing_key = self.coalescing_key.wrapping_add(1);
        }
        let event = TouchEvent {
            event_name: phase.event_name(),
            react_tag: self.root_tag,
            touches: self.react_touches.clone(),
            changed_indexes,
            coalescing_key: self.coalescing_key,
        };
        if !coalesce {
            self.coalescing_key = self.coalescing_key.wrapping_add(1);
        }

        self.sink.send_event(event)
    }
}
