// src/dom.rs
// Tolerant HTML tree + the selector subset the extractors actually use:
// type/class/id/[attr=value] simples, descendant and `>` combinators.

/// A parsed page. Owns every node; queries hand out [`NodeRef`] views.
pub struct Page {
    nodes: Vec<Node>,
}

struct Node {
    parent: usize,
    children: Vec<usize>,
    data: NodeData,
}

enum NodeData {
    Element { tag: String, attrs: Vec<(String, String)> },
    Text(String),
}

/// Borrowed handle to one node inside a [`Page`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    page: &'a Page,
    id: usize,
}

const ROOT: usize = 0;

// Elements that never have content and take no close tag.
const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link",
    "meta", "param", "source", "track", "wbr",
];

// Elements where a repeated open tag implies closing the previous one.
const SELF_NESTING: &[&str] = &["li", "p", "tr", "td", "th", "dd", "dt", "option"];

impl Page {
    pub fn parse(input: &str) -> Page {
        Parser::new(input).run()
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef { page: self, id: ROOT }
    }

    /// First element matching `selector`, in document order.
    pub fn first(&self, selector: &str) -> Option<NodeRef<'_>> {
        self.root().first(selector)
    }

    /// All elements matching `selector`, in document order.
    pub fn all(&self, selector: &str) -> Vec<NodeRef<'_>> {
        self.root().all(selector)
    }

    fn simple_matches(&self, id: usize, simple: &Simple) -> bool {
        let NodeData::Element { tag, attrs } = &self.nodes[id].data else {
            return false;
        };
        if let Some(want) = &simple.tag {
            if tag != want {
                return false;
            }
        }
        let attr = |name: &str| {
            attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        if let Some(want) = &simple.id {
            if attr("id") != Some(want) {
                return false;
            }
        }
        if !simple.classes.is_empty() {
            let Some(classes) = attr("class") else { return false };
            for want in &simple.classes {
                if !classes.split_ascii_whitespace().any(|c| c == want) {
                    return false;
                }
            }
        }
        for (name, value) in &simple.attrs {
            if attr(name) != Some(value.as_str()) {
                return false;
            }
        }
        true
    }

    // Does `parts[..=k]` match with `parts[k]` anchored at `id`? Ancestor
    // walks stop at `scope`, which itself may satisfy an earlier part
    // (descendant-or-self scoping, like the usual CSS translation).
    fn match_until(&self, id: usize, parts: &[(Comb, Simple)], k: usize, scope: usize) -> bool {
        if !self.simple_matches(id, &parts[k].1) {
            return false;
        }
        if k == 0 {
            return true;
        }
        match parts[k].0 {
            Comb::Child => {
                if id == scope {
                    return false;
                }
                self.match_until(self.nodes[id].parent, parts, k - 1, scope)
            }
            Comb::Descendant => {
                let mut cursor = id;
                while cursor != scope {
                    cursor = self.nodes[cursor].parent;
                    if self.match_until(cursor, parts, k - 1, scope) {
                        return true;
                    }
                }
                false
            }
        }
    }

    fn descendants(&self, scope: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![scope];
        while let Some(id) = stack.pop() {
            out.push(id);
            for &child in self.nodes[id].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }
}

impl<'a> NodeRef<'a> {
    pub fn first(&self, selector: &str) -> Option<NodeRef<'a>> {
        self.all(selector).into_iter().next()
    }

    pub fn all(&self, selector: &str) -> Vec<NodeRef<'a>> {
        let Some(sel) = parse_selector(selector) else {
            return Vec::new();
        };
        let last = sel.parts.len() - 1;
        self.page
            .descendants(self.id)
            .into_iter()
            .filter(|&id| self.page.match_until(id, &sel.parts, last, self.id))
            .map(|id| NodeRef { page: self.page, id })
            .collect()
    }

    pub fn tag(&self) -> &'a str {
        match &self.page.nodes[self.id].data {
            NodeData::Element { tag, .. } => tag,
            NodeData::Text(_) => "",
        }
    }

    /// Value of the named attribute, or None if absent.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        match &self.page.nodes[self.id].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    /// Whitespace-normalized text of this subtree.
    pub fn text(&self) -> String {
        let mut pieces = Vec::new();
        for id in self.page.descendants(self.id) {
            if let NodeData::Text(t) = &self.page.nodes[id].data {
                let t = t.trim();
                if !t.is_empty() {
                    pieces.push(t);
                }
            }
        }
        pieces.join(" ")
    }
}

/* ---------------- selector parsing ---------------- */

#[derive(Clone, Copy)]
enum Comb {
    Descendant,
    Child,
}

#[derive(Default)]
struct Simple {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
}

struct Selector {
    parts: Vec<(Comb, Simple)>,
}

fn parse_selector(input: &str) -> Option<Selector> {
    let mut parts = Vec::new();
    let mut pending = Comb::Descendant;
    for token in tokenize_selector(input) {
        if token == ">" {
            if parts.is_empty() {
                return None;
            }
            pending = Comb::Child;
            continue;
        }
        parts.push((pending, parse_simple(&token)?));
        pending = Comb::Descendant;
    }
    if parts.is_empty() {
        return None;
    }
    Some(Selector { parts })
}

fn tokenize_selector(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for ch in input.chars() {
        if ch.is_whitespace() || ch == '>' {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            if ch == '>' {
                out.push(">".to_string());
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn parse_simple(token: &str) -> Option<Simple> {
    let mut simple = Simple::default();
    let mut chars = token.chars().peekable();

    let name: String = take_while(&mut chars, is_name_char);
    if !name.is_empty() {
        simple.tag = Some(name.to_ascii_lowercase());
    }
    while let Some(&ch) = chars.peek() {
        chars.next();
        match ch {
            '.' => {
                let class = take_while(&mut chars, is_name_char);
                if class.is_empty() {
                    return None;
                }
                simple.classes.push(class);
            }
            '#' => {
                let id = take_while(&mut chars, is_name_char);
                if id.is_empty() {
                    return None;
                }
                simple.id = Some(id);
            }
            '[' => {
                let name = take_while(&mut chars, is_name_char);
                if name.is_empty() || chars.next() != Some('=') {
                    return None;
                }
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(c) if c == '"' || c == '\'' => {}
                        Some(c) => value.push(c),
                        None => return None,
                    }
                }
                simple.attrs.push((name.to_ascii_lowercase(), value));
            }
            _ => return None,
        }
    }
    if simple.tag.is_none()
        && simple.id.is_none()
        && simple.classes.is_empty()
        && simple.attrs.is_empty()
    {
        return None;
    }
    Some(simple)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_while(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    pred: impl Fn(char) -> bool,
) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if !pred(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

/* ---------------- html parsing ---------------- */

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    nodes: Vec<Node>,
    stack: Vec<usize>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let root = Node {
            parent: ROOT,
            children: Vec::new(),
            data: NodeData::Element { tag: "#root".to_string(), attrs: Vec::new() },
        };
        Self { input, pos: 0, nodes: vec![root], stack: vec![ROOT] }
    }

    fn run(mut self) -> Page {
        while self.pos < self.input.len() {
            if self.rest().starts_with("<!--") {
                self.skip_past("-->");
            } else if self.rest().starts_with("</") {
                self.close_tag();
            } else if self.rest().starts_with('<') && self.tag_follows() {
                self.open_tag();
            } else if self.rest().starts_with("<!") || self.rest().starts_with("<?") {
                self.skip_past(">");
            } else {
                self.text_run();
            }
        }
        Page { nodes: self.nodes }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_past(&mut self, marker: &str) {
        match self.rest().find(marker) {
            Some(i) => self.pos += i + marker.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn tag_follows(&self) -> bool {
        self.rest()[1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
    }

    fn text_run(&mut self) {
        // A stray '<' that opens no tag is kept as literal text.
        let start = self.pos;
        let first_len = self.rest().chars().next().map_or(1, char::len_utf8);
        let mut end = self.pos + first_len;
        if let Some(i) = self.input[end..].find('<') {
            end += i;
        } else {
            end = self.input.len();
        }
        self.pos = end;
        let raw = &self.input[start..end];
        if !raw.trim().is_empty() {
            let parent = *self.stack.last().unwrap_or(&ROOT);
            self.append(parent, NodeData::Text(decode_entities(raw)));
        }
    }

    fn close_tag(&mut self) {
        self.pos += 2;
        let name = self.read_name();
        self.skip_past(">");
        // Pop to the matching open element; ignore unmatched closers.
        if let Some(at) = self.stack.iter().rposition(|&id| self.tag_of(id) == Some(name.as_str())) {
            if at > 0 {
                self.stack.truncate(at);
            }
        }
    }

    fn open_tag(&mut self) {
        self.pos += 1;
        let name = self.read_name();
        let attrs = self.read_attrs();
        let self_closing = self.rest().starts_with("/>");
        self.skip_past(">");

        if SELF_NESTING.contains(&name.as_str()) {
            let sibling = |t: &str| t == name || (matches!(name.as_str(), "td" | "th") && matches!(t, "td" | "th"));
            if let Some(&top) = self.stack.last() {
                if top != ROOT && self.tag_of(top).is_some_and(|t| sibling(t)) {
                    self.stack.pop();
                }
            }
        }

        let parent = *self.stack.last().unwrap_or(&ROOT);
        let id = self.append(parent, NodeData::Element { tag: name.clone(), attrs });

        if name == "script" || name == "style" {
            // Raw text content, dropped wholesale.
            self.skip_past(&format!("</{name}"));
            self.skip_past(">");
            return;
        }
        if !self_closing && !VOID.contains(&name.as_str()) {
            self.stack.push(id);
        }
    }

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        for c in self.rest().chars() {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                name.push(c.to_ascii_lowercase());
            } else {
                break;
            }
        }
        self.pos += name.len();
        name
    }

    fn read_attrs(&mut self) -> Vec<(String, String)> {
        let mut attrs = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(c) = self.rest().chars().next() else { break };
            if c == '>' || self.rest().starts_with("/>") {
                break;
            }
            let name: String = self
                .rest()
                .chars()
                .take_while(|&c| !c.is_whitespace() && c != '=' && c != '>' && c != '/')
                .collect();
            if name.is_empty() {
                self.pos += c.len_utf8();
                continue;
            }
            self.pos += name.len();
            self.skip_whitespace();
            let mut value = String::new();
            if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                match self.rest().chars().next() {
                    Some(q) if q == '"' || q == '\'' => {
                        self.pos += 1;
                        if let Some(end) = self.rest().find(q) {
                            value = self.rest()[..end].to_string();
                            self.pos += end + 1;
                        } else {
                            value = self.rest().to_string();
                            self.pos = self.input.len();
                        }
                    }
                    _ => {
                        value = self
                            .rest()
                            .chars()
                            .take_while(|&c| !c.is_whitespace() && c != '>')
                            .collect();
                        self.pos += value.len();
                    }
                }
            }
            attrs.push((name.to_ascii_lowercase(), decode_entities(&value)));
        }
        attrs
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn tag_of(&self, id: usize) -> Option<&str> {
        match &self.nodes[id].data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    fn append(&mut self, parent: usize, data: NodeData) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node { parent, children: Vec::new(), data });
        self.nodes[parent].children.push(id);
        id
    }
}

/// Decode the handful of entities the archive actually emits, plus
/// numeric references.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let semi = rest.char_indices().take(12).find(|&(_, c)| c == ';').map(|(i, _)| i);
        let Some(semi) = semi else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => entity
                .strip_prefix('#')
                .and_then(|num| {
                    if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        num.parse().ok()
                    }
                })
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
