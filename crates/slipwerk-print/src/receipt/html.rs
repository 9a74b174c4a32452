// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Narrow HTML reader for receipt templates.
//
// This is not a general HTML parser.  Receipt templates are flat trees of
// `div`/`span`/`strong` elements distinguished by `class` tokens, so the
// grammar accepted here is deliberately small:
//
//   document := (comment | doctype | raw-text-element | tag | text)*
//   tag      := "<" name attribute* "/"? ">"  |  "</" name ">"
//
// Only the `class` attribute is retained.  Unknown or unbalanced closing tags
// are tolerated: a closing tag pops the open-element stack back to the
// nearest element with the same name, or is ignored when no such element is
// open.  Void elements never receive children.  `script` and `style`
// contents are skipped.  Entities are decoded in text nodes.  Nesting is
// capped at `MAX_DEPTH`; deeper start tags become childless leaves so that
// traversal and drop stay within the stack.

/// Elements that never have children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Deepest open-element stack, synthetic root included.
const MAX_DEPTH: usize = 256;

/// Elements whose content is skipped entirely.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "title"];

/// A node in the receipt tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with its class tokens and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub classes: Vec<String>,
    pub children: Vec<Node>,
}

impl Element {
    fn new(tag: String, classes: Vec<String>) -> Self {
        Self {
            tag,
            classes,
            children: Vec::new(),
        }
    }

    /// Whether the element carries exactly this class token.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Whether any class token contains `fragment`.
    pub fn has_class_containing(&self, fragment: &str) -> bool {
        self.classes.iter().any(|c| c.contains(fragment))
    }

    /// Child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// All descendant elements in document order (pre-order), excluding `self`.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        collect_descendants(self, &mut out);
        out
    }

    /// First descendant matching `pred`.
    pub fn find(&self, pred: impl Fn(&Element) -> bool) -> Option<&Element> {
        self.descendants().into_iter().find(|e| pred(e))
    }

    /// Every descendant matching `pred`, in document order.
    pub fn find_all(&self, pred: impl Fn(&Element) -> bool) -> Vec<&Element> {
        self.descendants().into_iter().filter(|e| pred(e)).collect()
    }

    /// First descendant with the class token `class`.
    pub fn find_class(&self, class: &str) -> Option<&Element> {
        self.find(|e| e.has_class(class))
    }

    /// Text of every descendant `<span>`, tag noise stripped.
    pub fn span_texts(&self) -> Vec<String> {
        self.find_all(|e| e.tag == "span")
            .into_iter()
            .map(Element::text)
            .collect()
    }

    /// Flattened text content: tags become spaces, whitespace collapses,
    /// leading and trailing space is trimmed.
    pub fn text(&self) -> String {
        let mut raw = String::new();
        collect_text(self, &mut raw);
        collapse_whitespace(&raw)
    }
}

fn collect_descendants<'a>(el: &'a Element, out: &mut Vec<&'a Element>) {
    for child in el.child_elements() {
        out.push(child);
        collect_descendants(child, out);
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for child in &el.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => {
                out.push(' ');
                collect_text(e, out);
                out.push(' ');
            }
        }
    }
}

/// Collapse runs of whitespace (including non-breaking space) to one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode the entities receipt templates use, plus numeric references.
/// Unknown entities are left untouched.
pub fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        // Entity names are short; a `;` further away means a bare ampersand.
        let decoded = tail
            .char_indices()
            .take(12)
            .find(|&(_, c)| c == ';')
            .and_then(|(semi, _)| decode_entity(&tail[1..semi]).map(|ch| (ch, semi)));

        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Parse `html` into a synthetic root element named `#document`.
pub fn parse(html: &str) -> Element {
    let mut stack: Vec<Element> = vec![Element::new("#document".into(), Vec::new())];
    let mut pos = 0;
    let bytes = html.as_bytes();

    while pos < html.len() {
        let Some(lt) = html[pos..].find('<').map(|i| pos + i) else {
            push_text(&mut stack, &html[pos..]);
            break;
        };
        if lt > pos {
            push_text(&mut stack, &html[pos..lt]);
        }

        let rest = &html[lt..];
        if rest.starts_with("<!--") {
            pos = rest.find("-->").map_or(html.len(), |end| lt + end + 3);
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            pos = rest.find('>').map_or(html.len(), |end| lt + end + 1);
            continue;
        }

        let next = bytes.get(lt + 1).copied();
        let is_close = next == Some(b'/');
        let starts_name = if is_close {
            bytes.get(lt + 2).is_some_and(u8::is_ascii_alphabetic)
        } else {
            next.is_some_and(|b| b.is_ascii_alphabetic())
        };
        if !starts_name {
            // A lone `<` in text.
            push_text(&mut stack, "<");
            pos = lt + 1;
            continue;
        }

        let Some(gt) = find_tag_end(html, lt) else {
            push_text(&mut stack, &html[lt..]);
            break;
        };
        let inner = &html[lt + 1..gt];
        pos = gt + 1;

        if is_close {
            close_element(&mut stack, &tag_name(&inner[1..]));
            continue;
        }

        let name = tag_name(inner);
        let self_closing = inner.trim_end().ends_with('/');
        let classes = class_tokens(inner);

        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            let closing = format!("</{name}");
            pos = find_ascii_ci(html, pos, &closing)
                .and_then(|start| html[start..].find('>').map(|end| start + end + 1))
                .unwrap_or(html.len());
            continue;
        }

        let element = Element::new(name.clone(), classes);
        let leaf = self_closing || VOID_ELEMENTS.contains(&name.as_str());
        if leaf || stack.len() >= MAX_DEPTH {
            attach(&mut stack, element);
        } else {
            stack.push(element);
        }
    }

    while stack.len() > 1 {
        if let Some(el) = stack.pop() {
            attach(&mut stack, el);
        }
    }
    stack.pop().unwrap_or_default()
}

/// Find the `>` ending the tag starting at `lt`, skipping quoted attribute values.
fn find_tag_end(html: &str, lt: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in html.as_bytes().iter().enumerate().skip(lt + 1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
    }
    None
}

fn find_ascii_ci(haystack: &str, from: usize, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    (from..hay.len().saturating_sub(needle.len() - 1))
        .find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

fn tag_name(inner: &str) -> String {
    inner
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Extract whitespace-separated tokens of the `class` attribute.
fn class_tokens(inner: &str) -> Vec<String> {
    let mut rest = inner;
    while let Some(idx) = find_ascii_ci(rest, 0, "class") {
        let before_ok = idx == 0 || rest.as_bytes()[idx - 1].is_ascii_whitespace();
        let after = rest[idx + 5..].trim_start();
        if before_ok && after.starts_with('=') {
            let value = after[1..].trim_start();
            let raw = match value.chars().next() {
                Some(q @ ('"' | '\'')) => value[1..].split(q).next().unwrap_or(""),
                _ => value
                    .split(|c: char| c.is_whitespace() || c == '>' || c == '/')
                    .next()
                    .unwrap_or(""),
            };
            return decode_entities(raw)
                .split_whitespace()
                .map(str::to_string)
                .collect();
        }
        rest = &rest[idx + 5..];
    }
    Vec::new()
}

fn push_text(stack: &mut [Element], raw: &str) {
    if raw.is_empty() {
        return;
    }
    if let Some(top) = stack.last_mut() {
        top.children.push(Node::Text(decode_entities(raw)));
    }
}

fn attach(stack: &mut [Element], el: Element) {
    if let Some(top) = stack.last_mut() {
        top.children.push(Node::Element(el));
    }
}

fn close_element(stack: &mut Vec<Element>, name: &str) {
    // Never pop the synthetic root.
    let Some(depth) = stack.iter().skip(1).rposition(|e| e.tag == name) else {
        return;
    };
    let target = depth + 1;
    while stack.len() > target {
        if let Some(el) = stack.pop() {
            attach(stack, el);
        }
    }
}
