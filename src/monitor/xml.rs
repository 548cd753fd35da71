//! Exact-match check of clipboard text against the canonical form of one XML document.

use std::{collections::HashMap, fmt::Write};

use anyhow::{anyhow, bail, Result};
use quick_xml::{
    escape::unescape_with,
    events::{BytesStart, Event},
    name::ResolveResult,
    NsReader,
};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefixes the element-tree serializer uses for well known namespaces.
const WELL_KNOWN_PREFIXES: &[(&str, &str)] = &[
    (XML_NAMESPACE, "xml"),
    ("http://www.w3.org/1999/xhtml", "html"),
    ("http://www.w3.org/1999/02/22-rdf-syntax-ns#", "rdf"),
    ("http://schemas.xmlsoap.org/wsdl/", "wsdl"),
    ("http://www.w3.org/2001/XMLSchema", "xs"),
    ("http://www.w3.org/2001/XMLSchema-instance", "xsi"),
    ("http://purl.org/dc/elements/1.1/", "dc"),
];

/// A namespace-resolved name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Name {
    ns: Option<String>,
    local: String,
}

#[derive(Debug)]
struct Element {
    /// Name as written, to match the end tag.
    raw: String,
    name: Name,
    attrs: Vec<(Name, String)>,
    children: Vec<Node>,
}

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

type Entities = HashMap<String, String>;

impl Element {
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_owned()));
        }
    }

    fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Element)) {
        f(self);
        for child in &self.children {
            if let Node::Element(e) = child {
                e.walk(f);
            }
        }
    }
}

/// Assigns prefixes to namespaces in document order, `ns0`, `ns1`, ... unless well known.
#[derive(Debug, Default)]
struct Prefixes {
    /// (uri, prefix) in the order first seen; the xml namespace is never declared.
    declared: Vec<(String, String)>,
    qnames: HashMap<Name, String>,
}

impl Prefixes {
    fn collect(root: &Element) -> Self {
        let mut prefixes = Prefixes::default();
        root.walk(&mut |e| {
            prefixes.add(&e.name);
            for (key, _) in &e.attrs {
                prefixes.add(key);
            }
        });
        prefixes
    }

    fn add(&mut self, name: &Name) {
        if self.qnames.contains_key(name) {
            return;
        }
        let qname = match &name.ns {
            None => name.local.clone(),
            Some(uri) => {
                let known = self
                    .declared
                    .iter()
                    .find(|(u, _)| u == uri)
                    .map(|(_, p)| p.clone());
                let prefix = match known {
                    Some(p) => p,
                    None => {
                        let prefix = WELL_KNOWN_PREFIXES
                            .iter()
                            .find(|(u, _)| u == uri)
                            .map(|(_, p)| p.to_string())
                            .unwrap_or_else(|| format!("ns{}", self.declared.len()));
                        if prefix != "xml" {
                            self.declared.push((uri.clone(), prefix.clone()));
                        }
                        prefix
                    }
                };
                format!("{}:{}", prefix, name.local)
            }
        };
        self.qnames.insert(name.clone(), qname);
    }

    fn qname<'a>(&'a self, name: &'a Name) -> &'a str {
        self.qnames
            .get(name)
            .map(String::as_str)
            .unwrap_or(name.local.as_str())
    }

    fn write(&self, element: &Element, is_root: bool, out: &mut String) {
        let tag = self.qname(&element.name);
        out.push('<');
        out.push_str(tag);
        if is_root {
            let mut declared: Vec<_> = self.declared.iter().collect();
            declared.sort_by(|a, b| a.1.cmp(&b.1));
            for (uri, prefix) in declared {
                let _ = write!(out, " xmlns:{}=\"{}\"", prefix, escape_attr(uri));
            }
        }
        for (key, value) in &element.attrs {
            let _ = write!(out, " {}=\"{}\"", self.qname(key), escape_attr(value));
        }
        if element.children.is_empty() {
            out.push_str(" />");
            return;
        }
        out.push('>');
        for child in &element.children {
            match child {
                Node::Element(e) => self.write(e, false, out),
                Node::Text(t) => out.push_str(&escape_text(t)),
            }
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

/// Returns true iff `content` is well-formed XML whose canonical form equals `template`.
///
/// Malformed input is an ordinary negative answer, logged at debug level only.
pub fn is_valid_xml(content: &str, template: &str) -> bool {
    match canonicalize(content) {
        Ok(canonical) => canonical == template,
        Err(e) => {
            log::debug!("Not well-formed XML: {:#}", e);
            false
        }
    }
}

/// Parses `content` as an XML document and renders its root element back to a string.
///
/// Comments, processing instructions, the declaration and anything outside the root element
/// are dropped; CDATA sections become plain text; line endings are normalized to `\n`.
/// Namespace declarations are resolved and re-emitted on the root only for namespaces in use,
/// with generated `nsN` prefixes. Internal entities declared in the DOCTYPE are expanded.
pub fn canonicalize(content: &str) -> Result<String> {
    let mut reader = NsReader::from_str(content);
    reader.check_end_names(true).check_comments(true);

    let mut stack: Vec<Element> = vec![];
    let mut root: Option<Element> = None;
    let mut entities = Entities::new();
    let mut started = false;

    loop {
        let event = reader.read_event()?;
        let first = !started;
        started = true;
        match event {
            Event::Decl(_) => {
                if !first {
                    bail!("XML declaration not at start of document")
                }
            }
            Event::DocType(e) => {
                if root.is_some() || !stack.is_empty() {
                    bail!("DOCTYPE after root element")
                }
                entities = parse_entities(std::str::from_utf8(&e)?)?;
            }
            Event::Start(e) => {
                if root.is_some() && stack.is_empty() {
                    bail!("junk after document element")
                }
                stack.push(open_element(&reader, &e, &entities)?);
            }
            Event::Empty(e) => {
                let element = open_element(&reader, &e, &entities)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None if root.is_none() => root = Some(element),
                    None => bail!("junk after document element"),
                }
            }
            Event::End(e) => {
                let raw = std::str::from_utf8(e.name().as_ref())?.to_owned();
                let element = match stack.pop() {
                    Some(el) if el.raw == raw => el,
                    Some(el) => bail!("mismatched tag: expected </{}>, found </{}>", el.raw, raw),
                    None => bail!("unexpected end tag </{}>", raw),
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => root = Some(element),
                }
            }
            Event::Text(e) => {
                let raw = normalize_newlines(std::str::from_utf8(&e)?);
                let text = expand(&raw, &entities)?;
                match stack.last_mut() {
                    Some(parent) => parent.push_text(&text),
                    None => {
                        if !is_xml_whitespace(&text) {
                            bail!("text outside of the root element")
                        }
                    }
                }
            }
            Event::CData(e) => {
                let data = e.into_inner();
                let text = normalize_newlines(std::str::from_utf8(&data)?);
                match stack.last_mut() {
                    Some(parent) => parent.push_text(&text),
                    None => bail!("CDATA outside of the root element"),
                }
            }
            Event::Comment(_) | Event::PI(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        bail!("unclosed element <{}>", open.raw)
    }
    let root = match root {
        Some(r) => r,
        None => bail!("no element found"),
    };
    let mut out = String::new();
    Prefixes::collect(&root).write(&root, true, &mut out);
    Ok(out)
}

fn open_element(
    reader: &NsReader<&[u8]>,
    start: &BytesStart,
    entities: &Entities,
) -> Result<Element> {
    let raw = std::str::from_utf8(start.name().as_ref())?.to_owned();
    let (ns, local) = reader.resolve_element(start.name());
    let name = resolved_name(ns, local.as_ref())?;

    let mut attrs: Vec<(Name, String)> = vec![];
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?;
        // literal whitespace in attribute values is normalized before references are expanded
        let raw = normalize_newlines(std::str::from_utf8(&attr.value)?).replace(['\n', '\t'], " ");
        let value = expand(&raw, entities)?;
        if key == "xmlns" || key.starts_with("xmlns:") {
            if key != "xmlns" && value.is_empty() {
                bail!("must not undeclare prefix {}", key)
            }
            continue;
        }
        let (ns, local) = reader.resolve_attribute(attr.key);
        let key = resolved_name(ns, local.as_ref())?;
        if attrs.iter().any(|(k, _)| *k == key) {
            bail!("duplicate attribute {:?}", key)
        }
        attrs.push((key, value.into_owned()));
    }
    Ok(Element {
        raw,
        name,
        attrs,
        children: vec![],
    })
}

fn resolved_name(ns: ResolveResult, local: &[u8]) -> Result<Name> {
    let ns = match ns {
        ResolveResult::Unbound => None,
        ResolveResult::Bound(ns) => Some(std::str::from_utf8(ns.as_ref())?.to_owned()),
        ResolveResult::Unknown(prefix) if prefix == b"xml" => Some(XML_NAMESPACE.to_owned()),
        ResolveResult::Unknown(prefix) => {
            bail!("unbound prefix {:?}", String::from_utf8_lossy(&prefix))
        }
    };
    Ok(Name {
        ns,
        local: std::str::from_utf8(local)?.to_owned(),
    })
}

/// Collects `<!ENTITY name "value">` declarations from a DOCTYPE body.
///
/// Parameter and external entities are skipped, as are values containing markup; references
/// to any of them fail to expand.
fn parse_entities(doctype: &str) -> Result<Entities> {
    const DECL: &str = "<!ENTITY";
    let malformed = || anyhow!("malformed ENTITY declaration");

    let mut entities = Entities::new();
    let mut rest = doctype;
    while let Some(pos) = rest.find(DECL) {
        rest = rest[pos + DECL.len()..].trim_start();
        if rest.starts_with('%') {
            continue;
        }
        let name_end = rest.find(char::is_whitespace).ok_or_else(malformed)?;
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();
        let quote = match rest.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => continue,
        };
        let end = rest[1..].find(quote).ok_or_else(malformed)? + 1;
        let value = &rest[1..end];
        rest = &rest[end + 1..];

        if entities.contains_key(name) || value.contains('<') {
            continue;
        }
        let value = expand(value, &entities)?.into_owned();
        entities.insert(name.to_owned(), value);
    }
    Ok(entities)
}

fn expand<'a>(raw: &'a str, entities: &Entities) -> Result<std::borrow::Cow<'a, str>> {
    Ok(unescape_with(raw, |name| {
        entities
            .get(name)
            .map(String::as_str)
            .or_else(|| predefined_entity(name))
    })?)
}

fn predefined_entity(name: &str) -> Option<&'static str> {
    match name {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        _ => None,
    }
}

fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

fn is_xml_whitespace(s: &str) -> bool {
    s.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\r' => out.push_str("&#13;"),
            '\n' => out.push_str("&#10;"),
            '\t' => out.push_str("&#09;"),
            _ => out.push(c),
        }
    }
    out
}
