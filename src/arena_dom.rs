// Majority of this file is from the html5ever project.
// https://github.com/servo/html5ever/blob/45b2fca5c6/html5ever/examples/arena.rs
//
// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::ptr;

use html5ever::interface::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::serialize::TraversalScope::{ChildrenOnly, IncludeNode};
use html5ever::serialize::{Serialize, Serializer, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_fragment, Attribute, ExpandedName, QualName};

/// Parses `bytes` as the content of a `<body>` element. Returns the document node; its only
/// child is the `<html>` element holding the parsed fragment.
pub fn parse_fragment_into_arena<'arena>(bytes: &[u8], arena: Arena<'arena>) -> Ref<'arena> {
    let sink = Sink {
        arena,
        document: arena.alloc(Node::new(NodeData::Document)),
        quirks_mode: QuirksMode::NoQuirks,
    };
    parse_fragment(
        sink,
        Default::default(),
        QualName::new(None, ns!(html), local_name!("body")),
        vec![],
    )
    .from_utf8()
    .one(bytes)
}

pub fn create_text<'arena>(arena: Arena<'arena>, text: &str) -> Ref<'arena> {
    arena.alloc(Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    }))
}

pub type Arena<'arena> = &'arena typed_arena::Arena<Node<'arena>>;

pub type Ref<'arena> = &'arena Node<'arena>;

pub type Link<'arena> = Cell<Option<Ref<'arena>>>;

pub struct Sink<'arena> {
    pub arena: Arena<'arena>,
    pub document: Ref<'arena>,
    pub quirks_mode: QuirksMode,
}

#[derive(Debug)]
pub struct Node<'arena> {
    pub parent: Link<'arena>,
    pub next_sibling: Link<'arena>,
    pub previous_sibling: Link<'arena>,
    pub first_child: Link<'arena>,
    pub last_child: Link<'arena>,
    pub data: NodeData<'arena>,
}

#[derive(Debug)]
pub enum NodeData<'arena> {
    Document,
    Doctype {
        name: StrTendril,
    },
    Text {
        contents: RefCell<StrTendril>,
    },
    Comment {
        contents: StrTendril,
    },
    Element {
        name: QualName,
        attrs: RefCell<Vec<Attribute>>,
        template_contents: Option<Ref<'arena>>,
        mathml_annotation_xml_integration_point: bool,
    },
    ProcessingInstruction {
        target: StrTendril,
        contents: StrTendril,
    },
}

impl<'arena> Node<'arena> {
    pub fn new(data: NodeData<'arena>) -> Self {
        Node {
            parent: Cell::new(None),
            previous_sibling: Cell::new(None),
            next_sibling: Cell::new(None),
            first_child: Cell::new(None),
            last_child: Cell::new(None),
            data,
        }
    }

    pub fn detach(&self) {
        let parent = self.parent.take();
        let previous_sibling = self.previous_sibling.take();
        let next_sibling = self.next_sibling.take();

        if let Some(next_sibling) = next_sibling {
            next_sibling.previous_sibling.set(previous_sibling);
        } else if let Some(parent) = parent {
            parent.last_child.set(previous_sibling);
        }

        if let Some(previous_sibling) = previous_sibling {
            previous_sibling.next_sibling.set(next_sibling);
        } else if let Some(parent) = parent {
            parent.first_child.set(next_sibling);
        }
    }

    pub fn unwrap(&self) -> Option<&'arena Self> {
        let parent = self.parent.take();
        let previous_sibling = self.previous_sibling.take();
        let next_sibling = self.next_sibling.take();
        let first_child = self.first_child.take();
        let last_child = self.last_child.take();

        if let Some(next_sibling) = next_sibling {
            if let Some(last_child) = last_child {
                next_sibling.previous_sibling.set(Some(last_child));
                last_child.next_sibling.set(Some(next_sibling));
            } else {
                next_sibling.previous_sibling.set(previous_sibling);
            }
        } else if let Some(parent) = parent {
            parent.last_child.set(previous_sibling);
            if let Some(last_child) = last_child {
                parent.last_child.set(Some(last_child));
            } else {
                parent.last_child.set(previous_sibling);
            }
        }

        if let Some(previous_sibling) = previous_sibling {
            if let Some(first_child) = first_child {
                previous_sibling.next_sibling.set(Some(first_child));
                first_child.previous_sibling.set(Some(previous_sibling));
            } else {
                previous_sibling.next_sibling.set(next_sibling);
            }
        } else if let Some(parent) = parent {
            parent.first_child.set(next_sibling);
            if let Some(first_child) = first_child {
                parent.first_child.set(Some(first_child));
            } else {
                parent.first_child.set(next_sibling);
            }
        }

        let mut child = first_child;
        while let Some(next_child) = child {
            next_child.parent.set(parent);
            child = next_child.next_sibling.get();
        }

        first_child
    }

    pub fn append(&'arena self, new_child: &'arena Self) {
        new_child.detach();
        new_child.parent.set(Some(self));
        if let Some(last_child) = self.last_child.take() {
            new_child.previous_sibling.set(Some(last_child));
            debug_assert!(last_child.next_sibling.get().is_none());
            last_child.next_sibling.set(Some(new_child));
        } else {
            debug_assert!(self.first_child.get().is_none());
            self.first_child.set(Some(new_child));
        }
        self.last_child.set(Some(new_child));
    }

    pub fn insert_before(&'arena self, new_sibling: &'arena Self) {
        new_sibling.detach();
        new_sibling.parent.set(self.parent.get());
        new_sibling.next_sibling.set(Some(self));
        if let Some(previous_sibling) = self.previous_sibling.take() {
            new_sibling.previous_sibling.set(Some(previous_sibling));
            debug_assert!(ptr::eq::<Node>(
                previous_sibling.next_sibling.get().unwrap(),
                self
            ));
            previous_sibling.next_sibling.set(Some(new_sibling));
        } else if let Some(parent) = self.parent.get() {
            debug_assert!(ptr::eq::<Node>(parent.first_child.get().unwrap(), self));
            parent.first_child.set(Some(new_sibling));
        }
        self.previous_sibling.set(Some(new_sibling));
    }

    /// Moves the content the parser set aside for a `<template>` under the element itself.
    pub fn adopt_template_contents(&'arena self) {
        if let NodeData::Element {
            template_contents: Some(contents),
            ..
        } = self.data
        {
            while let Some(child) = contents.first_child.get() {
                self.append(child);
            }
        }
    }
}

enum Frame<'a, 'arena> {
    Enter(&'a Node<'arena>),
    Leave(&'a QualName),
}

/// Pushes the children of `node` so that the first child is popped first.
fn push_children<'a, 'arena>(stack: &mut Vec<Frame<'a, 'arena>>, node: &'a Node<'arena>) {
    let mut previous = node.last_child.get();
    while let Some(child) = previous {
        stack.push(Frame::Enter(child));
        previous = child.previous_sibling.get();
    }
}

impl<'arena> fmt::Display for NodeData<'arena> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeData::Document => write!(f, "Document"),
            NodeData::Doctype { name, .. } => write!(f, "Doctype: {}", name),
            NodeData::Text { contents } => write!(
                f,
                "Text: {}...",
                &contents.borrow().chars().take(10).collect::<String>()
            ),
            NodeData::ProcessingInstruction { .. } => write!(f, "ProcessingInstruction: ..."),
            NodeData::Comment { contents } => write!(
                f,
                "Comment: {}...",
                &contents.chars().take(10).collect::<String>()
            ),
            NodeData::Element { ref name, .. } => write!(f, "Element: {}", &name.local),
        }
    }
}

impl<'arena> Sink<'arena> {
    fn new_node(&self, data: NodeData<'arena>) -> Ref<'arena> {
        self.arena.alloc(Node::new(data))
    }

    fn append_common<P, A>(&self, child: NodeOrText<Ref<'arena>>, previous: P, append: A)
    where
        P: FnOnce() -> Option<Ref<'arena>>,
        A: FnOnce(Ref<'arena>),
    {
        let new_node = match child {
            NodeOrText::AppendText(text) => {
                // Append to an existing Text node if we have one.
                if let Some(&Node {
                    data: NodeData::Text { ref contents },
                    ..
                }) = previous()
                {
                    contents.borrow_mut().push_tendril(&text);
                    return;
                }
                self.new_node(NodeData::Text {
                    contents: RefCell::new(text),
                })
            }
            NodeOrText::AppendNode(node) => node,
        };

        append(new_node)
    }
}

impl<'arena> TreeSink for Sink<'arena> {
    type Handle = Ref<'arena>;
    type Output = Ref<'arena>;

    fn finish(self) -> Ref<'arena> {
        self.document
    }

    fn parse_error(&mut self, _: Cow<'static, str>) {}

    fn get_document(&mut self) -> Ref<'arena> {
        self.document
    }

    fn set_quirks_mode(&mut self, mode: QuirksMode) {
        self.quirks_mode = mode;
    }

    fn same_node(&self, x: &Ref<'arena>, y: &Ref<'arena>) -> bool {
        ptr::eq::<Node>(*x, *y)
    }

    fn elem_name<'a>(&'a self, target: &'a Ref<'arena>) -> ExpandedName<'a> {
        match target.data {
            NodeData::Element { ref name, .. } => name.expanded(),
            _ => panic!("not an element!"),
        }
    }

    fn get_template_contents(&mut self, target: &Ref<'arena>) -> Ref<'arena> {
        if let NodeData::Element {
            template_contents: Some(ref contents),
            ..
        } = target.data
        {
            contents
        } else {
            panic!("not a template element!")
        }
    }

    fn is_mathml_annotation_xml_integration_point(&self, target: &Ref<'arena>) -> bool {
        if let NodeData::Element {
            mathml_annotation_xml_integration_point,
            ..
        } = target.data
        {
            mathml_annotation_xml_integration_point
        } else {
            panic!("not an element!")
        }
    }

    fn create_element(
        &mut self,
        name: QualName,
        attrs: Vec<Attribute>,
        flags: ElementFlags,
    ) -> Ref<'arena> {
        self.new_node(NodeData::Element {
            name,
            attrs: RefCell::new(attrs),
            template_contents: if flags.template {
                Some(self.new_node(NodeData::Document))
            } else {
                None
            },
            mathml_annotation_xml_integration_point: flags.mathml_annotation_xml_integration_point,
        })
    }

    fn create_comment(&mut self, text: StrTendril) -> Ref<'arena> {
        self.new_node(NodeData::Comment { contents: text })
    }

    fn create_pi(&mut self, target: StrTendril, data: StrTendril) -> Ref<'arena> {
        self.new_node(NodeData::ProcessingInstruction {
            target,
            contents: data,
        })
    }

    fn append(&mut self, parent: &Ref<'arena>, child: NodeOrText<Ref<'arena>>) {
        self.append_common(
            child,
            || parent.last_child.get(),
            |new_node| parent.append(new_node),
        )
    }

    fn append_before_sibling(&mut self, sibling: &Ref<'arena>, child: NodeOrText<Ref<'arena>>) {
        self.append_common(
            child,
            || sibling.previous_sibling.get(),
            |new_node| sibling.insert_before(new_node),
        )
    }

    fn append_based_on_parent_node(
        &mut self,
        element: &Ref<'arena>,
        prev_element: &Ref<'arena>,
        child: NodeOrText<Ref<'arena>>,
    ) {
        if element.parent.get().is_some() {
            self.append_before_sibling(element, child)
        } else {
            self.append(prev_element, child)
        }
    }

    fn append_doctype_to_document(
        &mut self,
        name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        self.document.append(self.new_node(NodeData::Doctype { name }))
    }

    fn add_attrs_if_missing(&mut self, target: &Ref<'arena>, attrs: Vec<Attribute>) {
        let mut existing = if let NodeData::Element { ref attrs, .. } = target.data {
            attrs.borrow_mut()
        } else {
            panic!("not an element")
        };

        let existing_names = existing
            .iter()
            .map(|attr| attr.name.clone())
            .collect::<HashSet<_>>();
        existing.extend(
            attrs
                .into_iter()
                .filter(|attr| !existing_names.contains(&attr.name)),
        );
    }

    fn remove_from_parent(&mut self, target: &Ref<'arena>) {
        target.detach()
    }

    fn reparent_children(&mut self, node: &Ref<'arena>, new_parent: &Ref<'arena>) {
        let mut next_child = node.first_child.get();
        while let Some(child) = next_child {
            debug_assert!(ptr::eq::<Node>(child.parent.get().unwrap(), *node));
            next_child = child.next_sibling.get();
            new_parent.append(child)
        }
    }
}

// Implementation adapted from implementation for RcDom:
// https://github.com/servo/html5ever/blob/45b2fca5c6/markup5ever/rcdom.rs#L410
// Elements are entered and left through an explicit stack instead of recursion.
impl<'arena> Serialize for Node<'arena> {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let mut stack = Vec::new();
        match (&traversal_scope, &self.data) {
            (&IncludeNode, _) => stack.push(Frame::Enter(self)),
            (&ChildrenOnly(_), &NodeData::Element { .. })
            | (&ChildrenOnly(_), &NodeData::Document) => push_children(&mut stack, self),
            (&ChildrenOnly(_), _) => {}
        }

        while let Some(frame) = stack.pop() {
            let node = match frame {
                Frame::Enter(node) => node,
                Frame::Leave(name) => {
                    serializer.end_elem(name.clone())?;
                    continue;
                }
            };
            match node.data {
                NodeData::Element {
                    ref name,
                    ref attrs,
                    ..
                } => {
                    serializer.start_elem(
                        name.clone(),
                        attrs.borrow().iter().map(|at| (&at.name, &at.value[..])),
                    )?;
                    stack.push(Frame::Leave(name));
                    push_children(&mut stack, node);
                }
                NodeData::Document => push_children(&mut stack, node),
                NodeData::Doctype { ref name } => serializer.write_doctype(name)?,
                NodeData::Text { ref contents } => serializer.write_text(&contents.borrow())?,
                NodeData::Comment { ref contents } => serializer.write_comment(contents)?,
                NodeData::ProcessingInstruction {
                    ref target,
                    ref contents,
                } => serializer.write_processing_instruction(target, contents)?,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use html5ever::serialize::{serialize, SerializeOpts};

    fn children_html(node: Ref) -> String {
        let mut output = vec![];
        serialize(&mut output, node, SerializeOpts::default()).unwrap();
        String::from_utf8(output).unwrap()
    }

    fn element<'arena>(node: Ref<'arena>, index: usize) -> Ref<'arena> {
        let mut child = node.first_child.get().unwrap();
        for _ in 0..index {
            child = child.next_sibling.get().unwrap();
        }
        child
    }

    #[test]
    fn parses_fragment_under_html_root() {
        let arena = typed_arena::Arena::new();
        let document = parse_fragment_into_arena(b"<p>one</p>two", &arena);
        let root = document.first_child.get().unwrap();
        assert!(root.next_sibling.get().is_none());
        assert_eq!(children_html(root), "<p>one</p>two");
    }

    #[test]
    fn unwrap_moves_children_into_place() {
        let arena = typed_arena::Arena::new();
        let document = parse_fragment_into_arena(b"a<span><b>1</b><i>2</i></span>z", &arena);
        let root = document.first_child.get().unwrap();
        let span = element(root, 1);

        let first = span.unwrap().unwrap();
        assert_eq!(format!("{}", first.data), "Element: b");
        assert!(span.parent.get().is_none());
        assert_eq!(children_html(root), "a<b>1</b><i>2</i>z");
        assert_eq!(format!("{}", root.last_child.get().unwrap().data), "Text: z...");
    }

    #[test]
    fn unwrap_of_empty_element_joins_siblings() {
        let arena = typed_arena::Arena::new();
        let document = parse_fragment_into_arena(b"<b>1</b><span></span><i>2</i>", &arena);
        let root = document.first_child.get().unwrap();
        assert!(element(root, 1).unwrap().is_none());
        assert_eq!(children_html(root), "<b>1</b><i>2</i>");
    }

    #[test]
    fn detach_and_insert_text() {
        let arena = typed_arena::Arena::new();
        let document = parse_fragment_into_arena(b"<b>1</b><i>2</i>", &arena);
        let root = document.first_child.get().unwrap();
        let bold = element(root, 0);
        let italic = element(root, 1);

        bold.detach();
        italic.insert_before(create_text(&arena, "<x>"));
        italic.append(create_text(&arena, "!"));
        assert_eq!(children_html(root), "&lt;x&gt;<i>2!</i>");
    }

    #[test]
    fn template_contents_move_under_the_template() {
        let arena = typed_arena::Arena::new();
        let document = parse_fragment_into_arena(b"<template><p>1</p>2</template>", &arena);
        let root = document.first_child.get().unwrap();
        let template = element(root, 0);
        assert_eq!(children_html(root), "<template></template>");

        template.adopt_template_contents();
        assert_eq!(children_html(root), "<template><p>1</p>2</template>");
        assert!(ptr::eq::<Node>(element(template, 1).parent.get().unwrap(), template));
    }
}
