//! Debug drawing hooks, compiled to no-ops without the `debug` feature.

use crate::math::Point2d;
#[cfg(feature = "debug")]
use serde_json::json;

#[cfg(feature = "debug")]
thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<serde_json::Value>> = Default::default();
);

/// Records the segment a vehicle travelled this step.
#[allow(unused)]
pub fn debug_segment(name: &str, from: Point2d, to: Point2d) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "kind": "segment",
            "name": name,
            "from": [from.x, from.y],
            "to": [to.x, to.y],
        }))
    })
}

/// Records a point of interest, such as a sensor ray's boundary crossing.
#[allow(unused)]
pub fn debug_marker(name: &str, at: Point2d) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "kind": "marker",
            "name": name,
            "at": [at.x, at.y],
        }))
    })
}

/// Drains the debug shapes recorded since the last call.
#[cfg(feature = "debug")]
pub fn take_debug_frame() -> serde_json::Value {
    json!(DEBUG_FRAME.with(|frame| frame.take()))
}
