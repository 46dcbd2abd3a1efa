// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host-side node used by unit tests.

use crate::attribute::{AttributeValue, Attributes, Point};
use crate::id::{GroupId, NodeId, ParentId};
use crate::node::{Gesture, GestureHooks, Node, NodeHooks, NodeIds, NodeMode};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub(crate) struct TestNode {
    ids: NodeIds,
    mode: NodeMode,
    hooks: GestureHooks,
    compatible: Cell<bool>,
    attributes: RefCell<Attributes>,
    parent_attributes: RefCell<Option<Attributes>>,
}

impl TestNode {
    pub(crate) fn with_ids(ids: NodeIds, mode: NodeMode) -> Rc<Self> {
        Rc::new(Self {
            ids,
            mode,
            hooks: GestureHooks::new(Point::ZERO),
            compatible: Cell::new(true),
            attributes: RefCell::new(Attributes::new()),
            parent_attributes: RefCell::new(None),
        })
    }

    pub(crate) fn new(parent: ParentId, group: GroupId, mode: NodeMode) -> Rc<Self> {
        Self::with_ids(
            NodeIds {
                id: NodeId::new(),
                parent,
                group,
            },
            mode,
        )
    }

    pub(crate) fn input(parent: ParentId) -> Rc<Self> {
        Self::new(parent, GroupId::new(), NodeMode::Input)
    }

    pub(crate) fn output(parent: ParentId) -> Rc<Self> {
        Self::new(parent, GroupId::new(), NodeMode::Output)
    }

    pub(crate) fn id(&self) -> NodeId {
        self.ids.id
    }

    pub(crate) fn set_compatible(&self, compatible: bool) {
        self.compatible.set(compatible);
    }

    pub(crate) fn set_attribute(&self, key: &str, value: impl Into<AttributeValue>) {
        self.attributes.borrow_mut().insert(key.to_string(), value.into());
    }

    pub(crate) fn set_parent_attributes(&self, attributes: Option<Attributes>) {
        *self.parent_attributes.borrow_mut() = attributes;
    }

    pub(crate) fn move_to(&self, position: Point) {
        self.hooks.set_root_position(position);
    }

    pub(crate) fn subscribers(&self, gesture: Gesture) -> usize {
        self.hooks.subscriber_count(gesture)
    }

    pub(crate) fn drag_start(&self) {
        self.hooks.emit(Gesture::DragStart);
    }

    pub(crate) fn drag(&self) {
        self.hooks.emit(Gesture::Drag);
    }

    pub(crate) fn drag_end(&self) {
        self.hooks.emit(Gesture::DragEnd);
    }

    pub(crate) fn enter(&self) {
        self.hooks.emit(Gesture::PointerEnter);
    }

    pub(crate) fn leave(&self) {
        self.hooks.emit(Gesture::PointerLeave);
    }
}

impl Node for TestNode {
    fn ids(&self) -> NodeIds {
        self.ids
    }

    fn mode(&self) -> NodeMode {
        self.mode
    }

    fn is_compatible(&self, _other: &dyn Node) -> bool {
        self.compatible.get()
    }

    fn attributes(&self) -> Attributes {
        self.attributes.borrow().clone()
    }

    fn parent_attributes(&self) -> Option<Attributes> {
        self.parent_attributes.borrow().clone()
    }

    fn hooks(&self) -> &dyn NodeHooks {
        &self.hooks
    }
}
