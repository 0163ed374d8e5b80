//! Arena-backed XML document that round-trips untouched regions byte for byte.
//!
//! Every node keeps the raw markup it was parsed from (start tag text,
//! escaped character data, comments, declarations). Serialization replays
//! that markup, so only nodes created after parsing are rendered from their
//! structured form. Node ids are stable for the lifetime of the document;
//! nodes are never removed.

use crate::domain::xml::namespaces::NamespaceTable;
use crate::infra::error::{TimestampingError, TimestampingResult};
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;

/// Deepest element nesting accepted by the parser.
const MAX_ELEMENT_DEPTH: usize = 4096;

/// Stable handle to a node inside an [`XmlDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Attribute with its unescaped value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
struct ElementData {
    qname: String,
    attributes: Vec<Attribute>,
    /// Start tag content between `<` and `>` (or `/>`) as parsed
    raw_start: Option<String>,
    self_closing: bool,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(ElementData),
    /// Escaped character data
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    Declaration(String),
    DocType(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Parsed XML document.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<Node>,
    /// Input started with a UTF-8 byte order mark
    bom: bool,
}

impl XmlDocument {
    const DOCUMENT: NodeId = NodeId(0);

    /// Parse well-formed XML, keeping all whitespace and markup as written.
    pub fn parse(text: &str) -> TimestampingResult<Self> {
        let (text, bom) = match text.strip_prefix('\u{feff}') {
            Some(rest) => (rest, true),
            None => (text, false),
        };
        let mut doc = XmlDocument {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            bom,
        };
        let mut reader = Reader::from_str(text);
        let mut open: Vec<NodeId> = vec![Self::DOCUMENT];

        loop {
            let position = reader.buffer_position();
            let event = reader.read_event().map_err(|e| {
                TimestampingError::XmlParseError(format!("at byte {position}: {e}"))
            })?;
            let parent = *open.last().unwrap_or(&Self::DOCUMENT);
            match event {
                Event::Start(start) => {
                    if open.len() > MAX_ELEMENT_DEPTH {
                        return Err(TimestampingError::XmlParseError(format!(
                            "at byte {position}: elements nested deeper than {MAX_ELEMENT_DEPTH} levels"
                        )));
                    }
                    let id = doc.push_parsed_element(parent, &start, false)?;
                    open.push(id);
                }
                Event::Empty(start) => {
                    doc.push_parsed_element(parent, &start, true)?;
                }
                Event::End(_) => {
                    if open.len() <= 1 {
                        return Err(TimestampingError::XmlParseError(format!(
                            "at byte {position}: unexpected closing tag"
                        )));
                    }
                    open.pop();
                }
                Event::Text(text) => {
                    let raw = utf8(&text, position)?;
                    if parent == Self::DOCUMENT && !raw.trim().is_empty() {
                        return Err(TimestampingError::XmlParseError(format!(
                            "at byte {position}: character data outside the root element"
                        )));
                    }
                    doc.push_node(parent, NodeKind::Text(raw));
                }
                Event::CData(data) => {
                    let raw = utf8(&data, position)?;
                    doc.push_node(parent, NodeKind::CData(raw));
                }
                Event::Comment(comment) => {
                    let raw = utf8(&comment, position)?;
                    doc.push_node(parent, NodeKind::Comment(raw));
                }
                Event::PI(pi) => {
                    let raw = utf8(&pi, position)?;
                    doc.push_node(parent, NodeKind::ProcessingInstruction(raw));
                }
                Event::Decl(decl) => {
                    let raw = utf8(&decl, position)?;
                    doc.push_node(parent, NodeKind::Declaration(raw));
                }
                Event::DocType(doctype) => {
                    let raw = utf8(&doctype, position)?;
                    doc.push_node(parent, NodeKind::DocType(raw));
                }
                Event::Eof => break,
            }
        }

        if open.len() > 1 {
            return Err(TimestampingError::XmlParseError(format!(
                "unexpected end of document, {} element(s) left open",
                open.len() - 1
            )));
        }
        let roots = doc
            .children(Self::DOCUMENT)
            .iter()
            .filter(|id| doc.is_element(**id))
            .count();
        if roots != 1 {
            return Err(TimestampingError::XmlParseError(format!(
                "expected exactly one root element, found {roots}"
            )));
        }
        Ok(doc)
    }

    fn push_parsed_element(
        &mut self,
        parent: NodeId,
        start: &BytesStart<'_>,
        self_closing: bool,
    ) -> TimestampingResult<NodeId> {
        let qname = String::from_utf8(start.name().as_ref().to_vec())
            .map_err(|_| TimestampingError::XmlParseError("element name is not UTF-8".into()))?;
        let raw_start = String::from_utf8(start.to_vec())
            .map_err(|_| TimestampingError::XmlParseError(format!("start tag of <{qname}> is not UTF-8")))?;
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| {
                TimestampingError::XmlParseError(format!("invalid attribute on <{qname}>: {e}"))
            })?;
            let name = String::from_utf8(attr.key.as_ref().to_vec()).map_err(|_| {
                TimestampingError::XmlParseError(format!("attribute name on <{qname}> is not UTF-8"))
            })?;
            let value = attr.unescape_value()?.into_owned();
            attributes.push(Attribute { name, value });
        }
        Ok(self.push_node(
            parent,
            NodeKind::Element(ElementData {
                qname,
                attributes,
                raw_start: Some(raw_start),
                self_closing,
            }),
        ))
    }

    fn push_node(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.allocate(kind);
        self.nodes[id.0].parent = Some(parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    fn allocate(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    // === Navigation ===

    /// The document element.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(Self::DOCUMENT)
            .iter()
            .copied()
            .find(|id| self.is_element(*id))
    }

    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map_or(&[], |node| &node.children)
    }

    /// Element children in document order.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
    }

    /// Descendant elements of `id` in document order, excluding `id` itself.
    #[must_use]
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if self.is_element(next) {
                found.push(next);
            }
            stack.extend(self.children(next).iter().rev().copied());
        }
        found
    }

    /// Qualified name as written, e.g. `ds:Signature`.
    #[must_use]
    pub fn qname(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|data| data.qname.as_str())
    }

    #[must_use]
    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        self.qname(id)
            .and_then(|qname| qname.split_once(':').map(|(prefix, _)| prefix))
    }

    #[must_use]
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.qname(id)
            .map(|qname| qname.split_once(':').map_or(qname, |(_, local)| local))
    }

    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id).map_or(&[], |data| &data.attributes)
    }

    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// `xmlns` declarations made on this element: prefix (`""` for default) → URI.
    #[must_use]
    pub fn namespace_declarations(&self, id: NodeId) -> Vec<(String, String)> {
        self.attributes(id)
            .iter()
            .filter_map(|attr| {
                if attr.name == "xmlns" {
                    Some((String::new(), attr.value.clone()))
                } else {
                    attr.name
                        .strip_prefix("xmlns:")
                        .map(|prefix| (prefix.to_string(), attr.value.clone()))
                }
            })
            .collect()
    }

    /// All namespace bindings visible at `id`, nearest declaration wins.
    #[must_use]
    pub fn in_scope_namespaces(&self, id: NodeId) -> BTreeMap<String, String> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.parent(current);
        }
        let mut scope = BTreeMap::new();
        for ancestor in chain.into_iter().rev() {
            for (prefix, uri) in self.namespace_declarations(ancestor) {
                scope.insert(prefix, uri);
            }
        }
        scope
    }

    /// Namespace URI of an element, resolved from its prefix.
    #[must_use]
    pub fn namespace_uri(&self, id: NodeId) -> Option<String> {
        let prefix = self.prefix(id).unwrap_or_default();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if let Some((_, uri)) = self
                .namespace_declarations(current)
                .into_iter()
                .find(|(declared, _)| declared == prefix)
            {
                return (!uri.is_empty()).then_some(uri);
            }
            cursor = self.parent(current);
        }
        None
    }

    /// Concatenated, unescaped character data below `id`.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            match &self.nodes[next.0].kind {
                NodeKind::Text(raw) => match unescape(raw) {
                    Ok(text) => out.push_str(&text),
                    Err(_) => out.push_str(raw),
                },
                NodeKind::CData(raw) => out.push_str(raw),
                NodeKind::Element(_) => stack.extend(self.children(next).iter().rev().copied()),
                _ => {}
            }
        }
    }

    /// Resolve a slash-separated path of (optionally prefixed) local names.
    ///
    /// Each segment selects the first matching descendant of the previous
    /// match. A prefixed segment matches namespace URI (looked up in `table`)
    /// plus local name; an unprefixed one matches the local name only.
    /// Returns `None` when any segment has no match.
    #[must_use]
    pub fn find_element(&self, node: NodeId, path: &str, table: &NamespaceTable) -> Option<NodeId> {
        let mut current = node;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let (expected_uri, local) = match segment.split_once(':') {
                Some((prefix, local)) => {
                    let uri = table
                        .uri(prefix)
                        .map(str::to_string)
                        .or_else(|| self.in_scope_namespaces(current).get(prefix).cloned())?;
                    (Some(uri), local)
                }
                None => (None, segment),
            };
            current = self.descendant_elements(current).into_iter().find(|candidate| {
                self.local_name(*candidate) == Some(local)
                    && expected_uri
                        .as_deref()
                        .map_or(true, |uri| self.namespace_uri(*candidate).as_deref() == Some(uri))
            })?;
        }
        Some(current)
    }

    /// Element children of `parent` with the given namespace URI and local name.
    #[must_use]
    pub fn children_named(&self, parent: NodeId, uri: &str, local: &str) -> Vec<NodeId> {
        self.child_elements(parent)
            .filter(|child| {
                self.local_name(*child) == Some(local)
                    && self.namespace_uri(*child).as_deref() == Some(uri)
            })
            .collect()
    }

    // === Mutation ===

    /// Create a detached element with no attributes.
    pub fn create_element(&mut self, qname: &str) -> NodeId {
        self.allocate(NodeKind::Element(ElementData {
            qname: qname.to_string(),
            attributes: Vec::new(),
            raw_start: None,
            self_closing: false,
        }))
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `node` as the sibling immediately following `reference`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> TimestampingResult<()> {
        let parent = self.parent(reference).ok_or_else(|| {
            TimestampingError::XmlParseError("cannot insert a sibling of the document node".into())
        })?;
        let siblings = &mut self.nodes[parent.0].children;
        let index = siblings
            .iter()
            .position(|sibling| *sibling == reference)
            .map_or(siblings.len(), |i| i + 1);
        siblings.insert(index, node);
        self.nodes[node.0].parent = Some(parent);
        Ok(())
    }

    /// Insert `node` as the sibling immediately preceding `reference`.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) -> TimestampingResult<()> {
        let parent = self.parent(reference).ok_or_else(|| {
            TimestampingError::XmlParseError("cannot insert a sibling of the document node".into())
        })?;
        let siblings = &mut self.nodes[parent.0].children;
        let index = siblings
            .iter()
            .position(|sibling| *sibling == reference)
            .unwrap_or(0);
        siblings.insert(index, node);
        self.nodes[node.0].parent = Some(parent);
        Ok(())
    }

    /// Replace all children of `id` with a single text node.
    pub fn replace_text(&mut self, id: NodeId, text: &str) {
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
        self.append_text(id, text);
    }

    /// Append character data (escaped on the way in) to `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let id = self.allocate(NodeKind::Text(escape(text).into_owned()));
        self.append_child(parent, id);
    }

    // === Serialization ===

    /// Serialize the whole document.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        if self.bom {
            out.push('\u{feff}');
        }
        for child in self.children(Self::DOCUMENT) {
            self.write_node(*child, &mut out);
        }
        out
    }

    /// Serialize one node and its subtree exactly as it appears in the document.
    #[must_use]
    pub fn serialize_node(&self, id: NodeId) -> String {
        let mut out = String::new();
        if id == Self::DOCUMENT {
            return self.serialize();
        }
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let mut pending = vec![WriteStep::Open(id)];
        while let Some(step) = pending.pop() {
            let id = match step {
                WriteStep::Open(id) => id,
                WriteStep::Close(id) => {
                    if let Some(data) = self.element(id) {
                        out.push_str("</");
                        out.push_str(&data.qname);
                        out.push('>');
                    }
                    continue;
                }
            };
            match &self.nodes[id.0].kind {
                NodeKind::Document => {}
                NodeKind::Element(data) => {
                    let children = self.children(id);
                    out.push('<');
                    match &data.raw_start {
                        Some(raw) => out.push_str(raw),
                        None => {
                            out.push_str(&data.qname);
                            for attr in &data.attributes {
                                out.push(' ');
                                out.push_str(&attr.name);
                                out.push_str("=\"");
                                out.push_str(&escape(&attr.value));
                                out.push('"');
                            }
                        }
                    }
                    if data.self_closing && children.is_empty() {
                        out.push_str("/>");
                        continue;
                    }
                    out.push('>');
                    pending.push(WriteStep::Close(id));
                    pending.extend(children.iter().rev().map(|child| WriteStep::Open(*child)));
                }
                NodeKind::Text(raw) => out.push_str(raw),
                NodeKind::CData(raw) => {
                    out.push_str("<![CDATA[");
                    out.push_str(raw);
                    out.push_str("]]>");
                }
                NodeKind::Comment(raw) => {
                    out.push_str("<!--");
                    out.push_str(raw);
                    out.push_str("-->");
                }
                NodeKind::ProcessingInstruction(raw) | NodeKind::Declaration(raw) => {
                    out.push_str("<?");
                    out.push_str(raw);
                    out.push_str("?>");
                }
                NodeKind::DocType(raw) => {
                    out.push_str("<!DOCTYPE ");
                    out.push_str(raw);
                    out.push('>');
                }
            }
        }
    }
}

/// Serializer work item: emit a node, or the end tag of an element.
enum WriteStep {
    Open(NodeId),
    Close(NodeId),
}

fn utf8(bytes: &[u8], position: usize) -> TimestampingResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| {
        TimestampingError::XmlParseError(format!("at byte {position}: content is not UTF-8"))
    })
}
