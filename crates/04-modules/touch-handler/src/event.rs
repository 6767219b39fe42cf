use serde::{Deserialize, Serialize};

use crate::error::{TouchError, TouchResult};
use crate::view::ViewId;

/// Touch identifiers are folded into this many slots.
const MAX_TOUCH_SLOTS: u32 = 20;

const SECONDARY_WHICH: u8 = 3;
const SECONDARY_BUTTON: i16 = 2;

/// Mouse input as reported by the host.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseInput {
    pub target: ViewId,
    #[serde(default)]
    pub which: Option<u8>,
    #[serde(default)]
    pub button: Option<i16>,
    pub page_x: f64,
    pub page_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub timestamp: f64,
}

/// One entry of a touch event's changed-touch list.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchPoint {
    pub target: ViewId,
    pub identifier: u32,
    pub page_x: f64,
    pub page_y: f64,
    pub client_x: f64,
    pub client_y: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RawInteraction {
    Mouse(MouseInput),
    #[serde(rename_all = "camelCase")]
    Touch {
        #[serde(default)]
        changed_touches: Option<Vec<TouchPoint>>,
        timestamp: f64,
    },
    /// Any other host event; carries its type name for diagnostics.
    Other { name: String },
}

/// Host-side record of one active touch.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeTouch {
    pub view: ViewId,
    pub identifier: u32,
    pub page_x: f64,
    pub page_y: f64,
    pub location_x: f64,
    pub location_y: f64,
    pub timestamp: f64,
}

/// Touch as reported to the worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactTouch {
    pub target: Option<u64>,
    pub identifier: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl ReactTouch {
    pub(crate) fn new(target: Option<u64>, identifier: u32) -> Self {
        Self {
            target,
            identifier,
            page_x: None,
            page_y: None,
            location_x: None,
            location_y: None,
            timestamp: None,
        }
    }

    pub(crate) fn update_from(&mut self, native: &NativeTouch) {
        self.page_x = Some(native.page_x);
        self.page_y = Some(native.page_y);
        self.location_x = Some(native.location_x);
        self.location_y = Some(native.location_y);
        self.timestamp = Some(native.timestamp);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
}

impl TouchPhase {
    pub fn event_name(self) -> &'static str {
        match self {
            TouchPhase::Start => "touchStart",
            TouchPhase::Move => "touchMove",
            TouchPhase::End => "touchEnd",
        }
    }

    pub fn can_coalesce(self) -> bool {
        self == TouchPhase::Move
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TouchEvent {
    pub event_name: &'static str,
    /// Tag of the root view the handler is attached to.
    pub react_tag: Option<u64>,
    pub touches: Vec<ReactTouch>,
    pub changed_indexes: Vec<usize>,
    pub coalescing_key: u16,
}

/// Converts host input into touches.
///
/// Secondary mouse button events yield `Ok(None)`: they never become touches.
pub fn normalize_interaction(raw: &RawInteraction) -> TouchResult<Option<Vec<NativeTouch>>> {
    match raw {
        RawInteraction::Mouse(mouse) => {
            if mouse.which == Some(SECONDARY_WHICH) || mouse.button == Some(SECONDARY_BUTTON) {
                return Ok(None);
            }
            Ok(Some(vec![NativeTouch {
                view: mouse.target,
                identifier: 0,
                page_x: mouse.page_x,
                page_y: mouse.page_y,
                location_x: mouse.offset_x,
                location_y: mouse.offset_y,
                timestamp: mouse.timestamp,
            }]))
        }
        RawInteraction::Touch {
            changed_touches: Some(points),
            timestamp,
        } => Ok(Some(
            points
                .iter()
                .map(|point| NativeTouch {
                    view: point.target,
                    identifier: point.identifier % MAX_TOUCH_SLOTS,
                    page_x: point.page_x,
                    page_y: point.page_y,
                    location_x: point.client_x,
                    location_y: point.client_y,
                    timestamp: *timestamp,
                })
                .collect(),
        )),
        RawInteraction::Touch {
            changed_touches: None,
            ..
        } => Err(TouchError::InvalidEvent("touch event without changed touches".into())),
        RawInteraction::Other { name } => Err(TouchError::InvalidEvent(name.clone())),
    }
}
