//! Overlay markup: a small element tree with HTML serialization.
//!
//! The ids below are the stable DOM contract host pages style against.

use crate::types::PopupContent;

pub const POPUP_ROOT_ID: &str = "pulse-retention-popup";
pub const CLOSE_BUTTON_ID: &str = "pulse-popup-close-btn";
pub const CTA_BUTTON_ID: &str = "pulse-popup-cta-btn";
pub const TITLE_ID: &str = "pulse-popup-title";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Escaped on serialization.
    Text(String),
    /// Trusted rich text, serialized verbatim.
    RawHtml(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: &'static str,
    pub id: Option<String>,
    pub class: Option<&'static str>,
    pub attributes: Vec<(&'static str, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            id: None,
            class: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &'static str) -> Self {
        self.class = Some(class);
        self
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attributes.push((name, value.into()));
        self
    }

    pub fn child(mut self, element: Element) -> Self {
        self.children.push(Node::Element(element));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn raw_html(mut self, html: impl Into<String>) -> Self {
        self.children.push(Node::RawHtml(html.into()));
        self
    }

    /// Ids of the elements from `self` down to the element carrying `id`,
    /// outermost first. Elements without an id are skipped.
    pub fn id_path(&self, id: &str) -> Option<Vec<String>> {
        if self.id.as_deref() == Some(id) {
            return Some(vec![id.to_string()]);
        }
        for child in &self.children {
            if let Node::Element(el) = child {
                if let Some(mut path) = el.id_path(id) {
                    if let Some(own) = &self.id {
                        path.insert(0, own.clone());
                    }
                    return Some(path);
                }
            }
        }
        None
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.id_path(id).is_some()
    }

    /// Every id in this subtree, including `self`.
    pub fn ids(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids(&self, out: &mut Vec<String>) {
        if let Some(id) = &self.id {
            out.push(id.clone());
        }
        for child in &self.children {
            if let Node::Element(el) = child {
                el.collect_ids(out);
            }
        }
    }

    /// Remove the first descendant carrying `id`. Returns the detached subtree.
    pub fn remove_descendant(&mut self, id: &str) -> Option<Element> {
        let position = self.children.iter().position(|child| {
            matches!(child, Node::Element(el) if el.id.as_deref() == Some(id))
        });
        if let Some(pos) = position {
            if let Node::Element(el) = self.children.remove(pos) {
                return Some(el);
            }
        }
        self.children.iter_mut().find_map(|child| match child {
            Node::Element(el) => el.remove_descendant(id),
            _ => None,
        })
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        if let Some(id) = &self.id {
            push_attr(out, "id", id);
        }
        if let Some(class) = self.class {
            push_attr(out, "class", class);
        }
        for (name, value) in &self.attributes {
            push_attr(out, name, value);
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(el) => el.write_html(out),
                Node::Text(text) => out.push_str(&escape_html(text)),
                Node::RawHtml(html) => out.push_str(html),
            }
        }
        out.push_str("</");
        out.push_str(self.tag);
        out.push('>');
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_html(value));
    out.push('"');
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Build the overlay tree for `content`.
pub fn build_overlay(content: &PopupContent) -> Element {
    let close = Element::new("button")
        .id(CLOSE_BUTTON_ID)
        .class("pulse-popup-close")
        .attr("type", "button")
        .attr("aria-label", "Close")
        .text("\u{00d7}");

    let header = Element::new("div").class("pulse-popup-header").child(
        Element::new("h2")
            .id(TITLE_ID)
            .class("pulse-popup-title")
            .text(content.title.as_str()),
    );

    let body = Element::new("div").class("pulse-popup-body").child(
        Element::new("div")
            .class("pulse-popup-message")
            .raw_html(content.message.as_str()),
    );

    let footer = Element::new("div").class("pulse-popup-footer").child(
        Element::new("a")
            .id(CTA_BUTTON_ID)
            .class("pulse-popup-cta")
            .attr("href", content.cta_link.as_str())
            .text(content.cta_text.as_str()),
    );

    Element::new("div")
        .id(POPUP_ROOT_ID)
        .class("pulse-popup-overlay")
        .child(
            Element::new("div")
                .class("pulse-popup-container")
                .child(close)
                .child(header)
                .child(body)
                .child(footer),
        )
}
