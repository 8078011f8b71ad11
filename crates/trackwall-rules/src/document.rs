//! Firewall rule document
//!
//! An owned element tree rebuilt from the file on every operation. Elements,
//! attributes, text and comments this crate does not understand are kept as
//! parsed and written back unchanged.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeSet;

use crate::error::RuleError;
use crate::tag::RuleTag;
use crate::Result;

const ROOT_TAG: &str = "rules";
const FILTER_TAG: &str = "component-filter";
const NAME_ATTR: &str = "name";
const BLOCK_ATTR: &str = "block";
const LOG_ATTR: &str = "log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// In document order
    pub attributes: Vec<(String, String)>,
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

    fn component_filter(filter_name: &str) -> Self {
        let mut filter = Element::new(FILTER_TAG);
        filter.set_attribute(NAME_ATTR, filter_name);
        filter
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, key: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attributes.push((key.to_string(), value.to_string())),
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    fn flag(&self, key: &str) -> bool {
        self.attribute(key)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    }

    /// `block="true"`; a missing attribute does not block
    pub fn is_blocking(&self) -> bool {
        self.flag(BLOCK_ATTR)
    }

    pub fn is_logging(&self) -> bool {
        self.flag(LOG_ATTR)
    }

    fn is_rule(&self, tag: RuleTag) -> bool {
        self.name == tag.as_str()
    }

    fn is_filter_named(&self, filter_name: &str) -> bool {
        self.name == FILTER_TAG && self.attribute(NAME_ATTR) == Some(filter_name)
    }

    fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.child_elements()
            .filter(|child| child.name == FILTER_TAG)
            .filter_map(|child| child.attribute(NAME_ATTR))
    }
}

/// Typed view of one rule element
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RuleSet {
    pub tag: RuleTag,
    pub block: bool,
    pub log: bool,
    pub filters: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallDocument {
    root: Element,
}

impl Default for FirewallDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl FirewallDocument {
    /// Empty `<rules></rules>` document
    pub fn new() -> Self {
        Self {
            root: Element::new(ROOT_TAG),
        }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Blank input is an empty document, same as a missing file
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let xml = std::str::from_utf8(bytes)
            .map_err(|e| RuleError::Parse(format!("rules file is not UTF-8: {}", e)))?;
        Self::parse(xml)
    }

    pub fn parse(xml: &str) -> Result<Self> {
        if xml.trim().is_empty() {
            return Ok(Self::new());
        }

        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| parse_error(&reader, e))?;

            match event {
                Event::Start(start) => {
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        RuleError::Parse("unbalanced end tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| RuleError::Parse(e.to_string()))?;
                    push_text(&mut stack, text.into_owned())?;
                }
                Event::CData(data) => {
                    let text = std::str::from_utf8(&data)
                        .map_err(|e| RuleError::Parse(e.to_string()))?;
                    push_text(&mut stack, text.to_string())?;
                }
                Event::Comment(comment) => {
                    // Comments outside the root element are dropped
                    if let Some(current) = stack.last_mut() {
                        let comment = std::str::from_utf8(&comment)
                            .map_err(|e| RuleError::Parse(e.to_string()))?;
                        current.children.push(Node::Comment(comment.to_string()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(RuleError::Parse(format!("unclosed element <{}>", open.name)));
        }

        let root = root
            .ok_or_else(|| RuleError::Parse("document has no root element".to_string()))?;

        if root.name != ROOT_TAG {
            return Err(RuleError::Parse(format!(
                "root element is <{}>, expected <{}>",
                root.name, ROOT_TAG
            )));
        }

        Ok(Self { root })
    }

    /// Serialize the whole document
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        write_element(&mut writer, &self.root, true)?;

        let mut xml = String::from_utf8(writer.into_inner())
            .map_err(|e| RuleError::Serialize(e.to_string()))?;
        xml.push('\n');
        Ok(xml)
    }

    /// Rule elements directly under `<rules>`, in document order
    pub fn rule_sets(&self) -> Vec<RuleSet> {
        self.root
            .child_elements()
            .filter_map(|element| {
                let tag = element.name.parse::<RuleTag>().ok()?;
                Some(RuleSet {
                    tag,
                    block: element.is_blocking(),
                    log: element.is_logging(),
                    filters: element.filter_names().map(str::to_string).collect(),
                })
            })
            .collect()
    }

    /// `component-filter` elements named `filter_name`, anywhere in the document
    pub fn filter_count(&self, filter_name: &str) -> usize {
        count_filters(&self.root, filter_name)
    }

    /// Remove every `component-filter` named `filter_name`, anywhere in the document
    pub fn remove_filters(&mut self, filter_name: &str) -> usize {
        remove_filters_in(&mut self.root, filter_name)
    }

    /// Append a filter under the first `<tag block="true">` element, which is
    /// left with `log="false"`.
    ///
    /// When no such element exists, a new `<tag block="true" log="false">` is
    /// appended, even if elements of the same tag with other settings exist.
    /// Those are left untouched.
    pub fn add_block_filter(&mut self, tag: RuleTag, filter_name: &str) {
        let filter = Node::Element(Element::component_filter(filter_name));

        let existing = self.root.children.iter_mut().find_map(|node| match node {
            Node::Element(element) if element.is_rule(tag) && element.is_blocking() => {
                Some(element)
            }
            _ => None,
        });

        match existing {
            Some(parent) => {
                parent.set_attribute(LOG_ATTR, "false");
                parent.children.push(filter);
            }
            None => {
                if self.root.child_elements().any(|e| e.is_rule(tag)) {
                    tracing::debug!(
                        tag = %tag,
                        "Existing rule element does not block, adding a blocking sibling"
                    );
                }

                let mut parent = Element::new(tag.as_str());
                parent.set_attribute(BLOCK_ATTR, "true");
                parent.set_attribute(LOG_ATTR, "false");
                parent.children.push(filter);
                self.root.children.push(Node::Element(parent));
            }
        }
    }

    /// Replace-on-write: drop any existing filter of that name, then add it
    /// under a blocking element. Returns the number of filters removed.
    pub fn block_component(&mut self, tag: RuleTag, filter_name: &str) -> usize {
        let removed = self.remove_filters(filter_name);
        self.add_block_filter(tag, filter_name);
        removed
    }

    /// `Some(logged)` when a blocking `<tag>` element names this filter
    pub fn blocking_state(&self, tag: RuleTag, filter_name: &str) -> Option<bool> {
        self.root
            .child_elements()
            .filter(|element| element.is_rule(tag) && element.is_blocking())
            .find(|element| element.filter_names().any(|name| name == filter_name))
            .map(Element::is_logging)
    }
}

fn parse_error(reader: &Reader<&[u8]>, error: quick_xml::Error) -> RuleError {
    RuleError::Parse(format!("{} at byte {}", error, reader.buffer_position()))
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| RuleError::Parse(e.to_string()))?
        .to_string();

    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| RuleError::Parse(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| RuleError::Parse(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| RuleError::Parse(e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        return Ok(());
    }

    if root.is_some() {
        return Err(RuleError::Parse("multiple root elements".to_string()));
    }

    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [Element], text: String) -> Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }

    match stack.last_mut() {
        Some(current) => {
            current.children.push(Node::Text(text));
            Ok(())
        }
        None => Err(RuleError::Parse("text outside the root element".to_string())),
    }
}

fn count_filters(element: &Element, filter_name: &str) -> usize {
    element
        .child_elements()
        .map(|child| {
            usize::from(child.is_filter_named(filter_name)) + count_filters(child, filter_name)
        })
        .sum()
}

fn remove_filters_in(element: &mut Element, filter_name: &str) -> usize {
    let before = element.children.len();
    element.children.retain(|node| {
        !matches!(node, Node::Element(child) if child.is_filter_named(filter_name))
    });
    let mut removed = before - element.children.len();

    for node in &mut element.children {
        if let Node::Element(child) = node {
            removed += remove_filters_in(child, filter_name);
        }
    }

    removed
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element, is_root: bool) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && !is_root {
        writer
            .write_event(Event::Empty(start))
            .map_err(|e| RuleError::Serialize(e.to_string()))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| RuleError::Serialize(e.to_string()))?;

    for child in &element.children {
        match child {
            Node::Element(child) => write_element(writer, child, false)?,
            Node::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| RuleError::Serialize(e.to_string()))?,
            Node::Comment(comment) => writer
                .write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))
                .map_err(|e| RuleError::Serialize(e.to_string()))?,
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| RuleError::Serialize(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXISTING: &str = r#"<rules>
    <!-- managed by hand -->
    <activity block="true" log="true">
        <component-filter name="com.example.app/com.example.app.AdActivity" />
    </activity>
    <service block="false" log="true">
        <intent-filter>
            <action name="com.example.SYNC" />
        </intent-filter>
        <component-filter name="com.example.app/com.example.app.SyncService" />
    </service>
    <broadcast block="true" log="false" />
</rules>"#;

    fn summary(document: &FirewallDocument) -> BTreeSet<RuleSet> {
        document.rule_sets().into_iter().collect()
    }

    #[test]
    fn test_parse_rule_sets() {
        let document = FirewallDocument::parse(EXISTING).unwrap();
        let sets = document.rule_sets();

        assert_eq!(sets.len(), 3);
        assert_eq!(sets[0].tag, RuleTag::Activity);
        assert!(sets[0].block && sets[0].log);
        assert!(sets[0]
            .filters
            .contains("com.example.app/com.example.app.AdActivity"));
        assert_eq!(sets[1].tag, RuleTag::Service);
        assert!(!sets[1].block);
        assert!(sets[2].filters.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_rules_and_foreign_content() {
        let document = FirewallDocument::parse(EXISTING).unwrap();
        let xml = document.to_xml().unwrap();
        let reparsed = FirewallDocument::parse(&xml).unwrap();

        assert_eq!(summary(&document), summary(&reparsed));
        assert_eq!(document, reparsed);
        assert!(xml.contains("<!-- managed by hand -->"));
        assert!(xml.contains(r#"<action name="com.example.SYNC"/>"#));
    }

    #[test]
    fn test_round_trip_ignores_attribute_order() {
        let a = FirewallDocument::parse(
            r#"<rules><activity log="false" block="true"><component-filter name="p/C"/></activity></rules>"#,
        )
        .unwrap();
        let b = FirewallDocument::parse(
            r#"<rules><activity block="true" log="false"><component-filter name="p/C"/></activity></rules>"#,
        )
        .unwrap();

        let a = FirewallDocument::parse(&a.to_xml().unwrap()).unwrap();
        assert_eq!(summary(&a), summary(&b));
    }

    #[test]
    fn test_blank_input_is_empty_document() {
        let document = FirewallDocument::from_bytes(b"  \n").unwrap();
        assert_eq!(document, FirewallDocument::new());
        assert!(document.rule_sets().is_empty());

        let xml = document.to_xml().unwrap();
        assert!(xml.contains("<rules>"));
        assert!(xml.contains("</rules>"));
    }

    #[test]
    fn test_malformed_documents() {
        for xml in [
            "<rules><activity></rules>",
            "<rules>",
            "<rules/><rules/>",
            "<config/>",
            "just text",
        ] {
            let err = FirewallDocument::parse(xml).unwrap_err();
            assert!(matches!(err, RuleError::Parse(_)), "accepted {:?}", xml);
        }

        let err = FirewallDocument::from_bytes(&[0x3c, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, RuleError::Parse(_)));
    }

    #[test]
    fn test_block_component_replaces_existing_filter() {
        let mut document = FirewallDocument::parse(EXISTING).unwrap();
        let name = "com.example.app/com.example.app.SyncService";

        let removed = document.block_component(RuleTag::Service, name);
        assert_eq!(removed, 1);
        assert_eq!(document.filter_count(name), 1);

        let removed = document.block_component(RuleTag::Service, name);
        assert_eq!(removed, 1);
        assert_eq!(document.filter_count(name), 1);
        assert_eq!(document.blocking_state(RuleTag::Service, name), Some(false));
    }

    #[test]
    fn test_non_blocking_element_gets_sibling() {
        let mut document = FirewallDocument::parse(EXISTING).unwrap();
        document.add_block_filter(RuleTag::Service, "com.example.app/com.tracker.Job");

        let services: Vec<RuleSet> = document
            .rule_sets()
            .into_iter()
            .filter(|set| set.tag == RuleTag::Service)
            .collect();
        assert_eq!(services.len(), 2);
        assert!(!services[0].block);
        assert!(services[0].log);
        assert!(services[1].block);
        assert!(!services[1].log);
        assert!(services[1].filters.contains("com.example.app/com.tracker.Job"));

        // The original element keeps its intent-filter untouched
        let original = document
            .root()
            .child_elements()
            .find(|e| e.name == "service" && !e.is_blocking())
            .unwrap();
        assert!(original.child_elements().any(|e| e.name == "intent-filter"));
    }

    #[test]
    fn test_reused_blocking_element_stops_logging() {
        let mut document = FirewallDocument::parse(EXISTING).unwrap();
        let name = "com.example.app/com.tracker.Splash";
        document.add_block_filter(RuleTag::Activity, name);

        let activities: Vec<RuleSet> = document
            .rule_sets()
            .into_iter()
            .filter(|set| set.tag == RuleTag::Activity)
            .collect();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].filters.len(), 2);
        assert!(activities[0].block);
        assert!(!activities[0].log);
        assert_eq!(document.blocking_state(RuleTag::Activity, name), Some(false));
    }

    #[test]
    fn test_remove_filters_anywhere() {
        let mut document = FirewallDocument::parse(
            r#"<rules>
                <activity block="true"><component-filter name="p/A"/></activity>
                <activity block="false"><component-filter name="p/A"/><component-filter name="p/B"/></activity>
                <service block="true"><intent-filter><component-filter name="p/A"/></intent-filter></service>
            </rules>"#,
        )
        .unwrap();

        assert_eq!(document.filter_count("p/A"), 3);
        assert_eq!(document.remove_filters("p/A"), 3);
        assert_eq!(document.filter_count("p/A"), 0);
        assert_eq!(document.filter_count("p/B"), 1);
        assert_eq!(document.remove_filters("p/missing"), 0);
    }

    #[test]
    fn test_escaping_survives_round_trip() {
        let mut document = FirewallDocument::new();
        document.add_block_filter(RuleTag::Broadcast, "p/Weird&<\"Name\">");

        let xml = document.to_xml().unwrap();
        let reparsed = FirewallDocument::parse(&xml).unwrap();
        assert_eq!(
            reparsed.blocking_state(RuleTag::Broadcast, "p/Weird&<\"Name\">"),
            Some(false)
        );
    }
}
