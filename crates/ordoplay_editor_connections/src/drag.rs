// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drag-to-connect gesture state.

use crate::attribute::Point;
use crate::node::NodeRef;

/// State of the connection currently being drawn
#[derive(Debug, Clone, Default)]
pub enum DragState {
    /// No gesture in progress
    #[default]
    Idle,
    /// Dragging from `origin`, nothing under the pointer
    Dragging {
        /// Node the gesture started on
        origin: NodeRef,
        /// Root position of the origin at drag start
        anchor: Point,
    },
    /// Dragging from `origin` over `target`
    Targeting {
        /// Node the gesture started on
        origin: NodeRef,
        /// Root position of the origin at drag start
        anchor: Point,
        /// Node currently under the pointer
        target: NodeRef,
    },
}

impl DragState {
    /// Start a gesture, discarding any previous one
    pub fn begin(origin: NodeRef, anchor: Point) -> Self {
        Self::Dragging { origin, anchor }
    }

    /// Pointer entered `node`.
    ///
    /// Makes it the target unless it is the origin; entering the current
    /// target again clears it.
    pub fn enter(self, node: &NodeRef) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Dragging { origin, anchor } => {
                if origin.same_node(node) {
                    Self::Dragging { origin, anchor }
                } else {
                    Self::Targeting {
                        origin,
                        anchor,
                        target: node.clone(),
                    }
                }
            }
            Self::Targeting {
                origin,
                anchor,
                target,
            } => {
                if target.same_node(node) {
                    Self::Dragging { origin, anchor }
                } else if origin.same_node(node) {
                    Self::Targeting {
                        origin,
                        anchor,
                        target,
                    }
                } else {
                    Self::Targeting {
                        origin,
                        anchor,
                        target: node.clone(),
                    }
                }
            }
        }
    }

    /// Pointer left `node`; clears the target if it was `node`
    pub fn leave(self, node: &NodeRef) -> Self {
        match self {
            Self::Targeting {
                origin,
                anchor,
                target,
            } if target.same_node(node) => Self::Dragging { origin, anchor },
            other => other,
        }
    }

    /// Drop every reference to a node that left the registry.
    ///
    /// Losing the origin ends the gesture; losing the target keeps dragging.
    pub fn forget(self, node: &NodeRef) -> Self {
        match self {
            Self::Dragging { ref origin, .. } | Self::Targeting { ref origin, .. }
                if origin.same_node(node) =>
            {
                Self::Idle
            }
            other => other.leave(node),
        }
    }

    /// Node the current gesture started on
    pub fn origin(&self) -> Option<&NodeRef> {
        match self {
            Self::Idle => None,
            Self::Dragging { origin, .. } | Self::Targeting { origin, .. } => Some(origin),
        }
    }

    /// Node currently under the pointer
    pub fn target(&self) -> Option<&NodeRef> {
        match self {
            Self::Targeting { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Anchor captured at drag start
    pub fn anchor(&self) -> Option<Point> {
        match self {
            Self::Idle => None,
            Self::Dragging { anchor, .. } | Self::Targeting { anchor, .. } => Some(*anchor),
        }
    }

    /// Whether a gesture is in progress
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ParentId;
    use crate::testing::TestNode;

    #[test]
    fn test_hover_while_idle_is_ignored() {
        let node = TestNode::input(ParentId::new());
        let state = DragState::Idle.enter(&NodeRef::new(&node));
        assert!(state.target().is_none());
        assert!(!state.is_active());
    }

    #[test]
    fn test_enter_and_leave_target() {
        let origin = TestNode::output(ParentId::new());
        let other = TestNode::input(ParentId::new());
        let (origin_ref, other_ref) = (NodeRef::new(&origin), NodeRef::new(&other));

        let state = DragState::begin(origin_ref.clone(), Point::new(3.0, 4.0));
        assert_eq!(state.anchor(), Some(Point::new(3.0, 4.0)));

        let state = state.enter(&other_ref);
        assert_eq!(state.target(), Some(&other_ref));
        assert_eq!(state.origin(), Some(&origin_ref));

        let state = state.leave(&other_ref);
        assert!(state.target().is_none());
        assert!(state.is_active());
    }

    #[test]
    fn test_reentering_target_toggles_off() {
        let origin = TestNode::output(ParentId::new());
        let other = TestNode::input(ParentId::new());
        let other_ref = NodeRef::new(&other);

        let state = DragState::begin(NodeRef::new(&origin), Point::ZERO)
            .enter(&other_ref)
            .enter(&other_ref);
        assert!(state.target().is_none());
    }

    #[test]
    fn test_origin_never_becomes_target() {
        let origin = TestNode::output(ParentId::new());
        let other = TestNode::input(ParentId::new());
        let (origin_ref, other_ref) = (NodeRef::new(&origin), NodeRef::new(&other));

        let state = DragState::begin(origin_ref.clone(), Point::ZERO).enter(&origin_ref);
        assert!(state.target().is_none());

        let state = state.enter(&other_ref).enter(&origin_ref);
        assert_eq!(state.target(), Some(&other_ref));
    }

    #[test]
    fn test_forget_origin_ends_gesture() {
        let origin = TestNode::output(ParentId::new());
        let other = TestNode::input(ParentId::new());
        let (origin_ref, other_ref) = (NodeRef::new(&origin), NodeRef::new(&other));

        let state = DragState::begin(origin_ref.clone(), Point::ZERO).enter(&other_ref);
        let kept = state.clone().forget(&other_ref);
        assert!(kept.target().is_none());
        assert_eq!(kept.origin(), Some(&origin_ref));

        assert!(!state.forget(&origin_ref).is_active());
    }

    #[test]
    fn test_leaving_other_node_keeps_target() {
        let origin = TestNode::output(ParentId::new());
        let first = TestNode::input(ParentId::new());
        let second = TestNode::input(ParentId::new());
        let (first_ref, second_ref) = (NodeRef::new(&first), NodeRef::new(&second));

        let state = DragState::begin(NodeRef::new(&origin), Point::ZERO)
            .enter(&first_ref)
            .enter(&second_ref)
            .leave(&first_ref);
        assert_eq!(state.target(), Some(&second_ref));
    }
}
