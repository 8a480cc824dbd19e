// A small owned XML tree for server.xml style documents.
//
// `quick-xml` gives us a stream of events; the patcher wants to look things up,
// insert siblings and rewrite attributes. This module turns the stream into an
// owned `Document` and back. Comments, processing instructions, the XML
// declaration and the doctype survive the round trip. Whitespace-only text does
// not; indentation is regenerated on output so repeated patching is stable.

use crate::libs::errors::XmlError;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

const INDENT: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    Declaration(String),
    DocType(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }
}

/// An element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style `set_attr`.
    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replaces the value in place if the attribute exists, otherwise appends it.
    /// Existing attribute order is kept so diffs against the vendor file stay small.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    /// Case-insensitive attribute comparison, for boolean-ish values like `SSLEnabled="True"`.
    pub fn attr_eq_ignore_case(&self, key: &str, expected: &str) -> bool {
        self.attr(key).is_some_and(|v| v.eq_ignore_ascii_case(expected))
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(Node::as_element_mut)
    }

    pub fn find_child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.name == name)
    }

    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.child_elements_mut().find(|e| e.name == name)
    }

    /// Index into `children` of the first element matching `pred`.
    pub fn child_index(&self, pred: impl Fn(&Element) -> bool) -> Option<usize> {
        self.children
            .iter()
            .position(|n| n.as_element().is_some_and(&pred))
    }

    /// Index into `children` of the last element matching `pred`.
    pub fn last_child_index(&self, pred: impl Fn(&Element) -> bool) -> Option<usize> {
        self.children
            .iter()
            .rposition(|n| n.as_element().is_some_and(&pred))
    }

    pub fn child_at_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.children.get_mut(index).and_then(Node::as_element_mut)
    }

    pub fn insert_child(&mut self, index: usize, child: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, Node::Element(child));
    }

    pub fn append_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Drops every child element named `name`; other nodes are kept.
    pub fn remove_children_named(&mut self, name: &str) {
        self.children
            .retain(|n| !matches!(n, Node::Element(e) if e.name == name));
    }
}

/// A parsed document: whatever precedes the root, the root, whatever follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub prolog: Vec<Node>,
    pub root: Element,
    pub epilog: Vec<Node>,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    /// Parses XML text into a document.
    ///
    /// # Returns
    /// * `Err(XmlError)` for malformed input: mismatched or unclosed tags,
    ///   bad attributes, no root element or more than one.
    pub fn parse(text: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut builder = TreeBuilder::default();
        loop {
            let position = u64::try_from(reader.buffer_position()).unwrap_or(u64::MAX);
            let fail = |message: String| XmlError { position, message };

            let event = reader.read_event().map_err(|e| fail(e.to_string()))?;
            match event {
                Event::Start(start) => builder.stack.push(element_from(&start).map_err(fail)?),
                Event::Empty(start) => {
                    let element = element_from(&start).map_err(fail)?;
                    builder.attach(Node::Element(element)).map_err(fail)?;
                }
                Event::End(_) => {
                    let element = builder
                        .stack
                        .pop()
                        .ok_or_else(|| fail("unexpected closing tag".to_string()))?;
                    builder.attach(Node::Element(element)).map_err(fail)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| fail(e.to_string()))?;
                    if !text.trim().is_empty() {
                        builder.attach(Node::Text(text.into_owned())).map_err(fail)?;
                    }
                }
                Event::CData(data) => builder.attach(Node::CData(lossy(&data))).map_err(fail)?,
                Event::Comment(comment) => builder.attach(Node::Comment(lossy(&comment))).map_err(fail)?,
                Event::Decl(decl) => builder.attach(Node::Declaration(lossy(&decl))).map_err(fail)?,
                Event::PI(pi) => builder.attach(Node::ProcessingInstruction(lossy(&pi))).map_err(fail)?,
                Event::DocType(doctype) => builder.attach(Node::DocType(lossy(&doctype))).map_err(fail)?,
                Event::Eof => {
                    if let Some(open) = builder.stack.last() {
                        return Err(fail(format!("element <{}> is never closed", open.name)));
                    }
                    break;
                }
            }
        }

        let root = builder.root.ok_or_else(|| XmlError {
            position: 0,
            message: "document has no root element".to_string(),
        })?;
        Ok(Self {
            prolog: builder.prolog,
            root,
            epilog: builder.epilog,
        })
    }

    /// Serializes with two-space indentation and a trailing newline.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        for node in &self.prolog {
            write_node(&mut out, node, 0);
        }
        write_element(&mut out, &self.root, 0);
        for node in &self.epilog {
            write_node(&mut out, node, 0);
        }
        out
    }
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Element>,
    root: Option<Element>,
    prolog: Vec<Node>,
    epilog: Vec<Node>,
}

impl TreeBuilder {
    /// Hangs a finished node on the innermost open element, or at document level.
    fn attach(&mut self, node: Node) -> Result<(), String> {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
            return Ok(());
        }
        match node {
            Node::Element(element) => {
                if self.root.is_some() {
                    return Err(format!("second root element <{}>", element.name));
                }
                self.root = Some(element);
            }
            Node::Text(_) | Node::CData(_) => {
                return Err("text outside of the root element".to_string());
            }
            other => {
                if self.root.is_none() {
                    self.prolog.push(other);
                } else {
                    self.epilog.push(other);
                }
            }
        }
        Ok(())
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<Element, String> {
    let mut element = Element::new(lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = lossy(attr.key.as_ref());
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    let line = match node {
        Node::Element(element) => return write_element(out, element, depth),
        Node::Text(text) => escape(text.as_str()).into_owned(),
        Node::CData(data) => format!("<![CDATA[{}]]>", data),
        Node::Comment(comment) => format!("<!--{}-->", comment),
        Node::Declaration(content) | Node::ProcessingInstruction(content) => format!("<?{}?>", content),
        Node::DocType(content) => format!("<!DOCTYPE {}>", content.trim_start()),
    };
    indent(out, depth);
    out.push_str(&line);
    out.push('\n');
}

fn write_element(out: &mut String, element: &Element, depth: usize) {
    indent(out, depth);
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }

    match element.children.as_slice() {
        [] => out.push_str("/>\n"),
        // Keep `<name>text</name>` on one line.
        [Node::Text(text)] => {
            out.push('>');
            out.push_str(&escape(text.as_str()));
            out.push_str("</");
            out.push_str(&element.name);
            out.push_str(">\n");
        }
        children => {
            out.push_str(">\n");
            for child in children {
                write_node(out, child, depth + 1);
            }
            indent(out, depth);
            out.push_str("</");
            out.push_str(&element.name);
            out.push_str(">\n");
        }
    }
}
