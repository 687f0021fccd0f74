//! Lightweight XML element tree.

use quick_xml::Reader;
use quick_xml::events::Event;
use wireshape_core::UnmarshallingError;

/// One parsed XML element.
#[derive(Debug, Clone, Default)]
pub(crate) struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    pub text: String,
}

impl XmlNode {
    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse an XML document into its root element.
pub(crate) fn parse_xml(body: &[u8]) -> Result<XmlNode, UnmarshallingError> {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();
    let mut stack: Vec<XmlNode> = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(UnmarshallingError::deserialization)?;
        match event {
            Event::Start(start) => {
                stack.push(node_from_start(&start)?);
            }
            Event::Empty(start) => {
                let node = node_from_start(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => return Ok(node),
                }
            }
            Event::Text(text) => {
                let decoded = text
                    .decode()
                    .map_err(UnmarshallingError::deserialization)?;
                let unescaped = quick_xml::escape::unescape(&decoded)
                    .map_err(UnmarshallingError::deserialization)?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&unescaped);
                }
            }
            Event::GeneralRef(reference) => {
                let name = reference
                    .decode()
                    .map_err(UnmarshallingError::deserialization)?;
                let token = format!("&{name};");
                let resolved = quick_xml::escape::unescape(&token)
                    .map_err(UnmarshallingError::deserialization)?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&resolved);
                }
            }
            Event::CData(cdata) => {
                if let Some(node) = stack.last_mut() {
                    node.text
                        .push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| {
                    UnmarshallingError::deserialization("unbalanced closing element")
                })?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => return Ok(node),
                }
            }
            Event::Eof => {
                return Err(UnmarshallingError::deserialization(
                    "document contains no root element",
                ));
            }
            // Prolog, comments, and processing instructions carry no data.
            _ => {}
        }
        buf.clear();
    }
}

fn node_from_start(
    start: &quick_xml::events::BytesStart<'_>,
) -> Result<XmlNode, UnmarshallingError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(UnmarshallingError::deserialization)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(UnmarshallingError::deserialization)?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlNode {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let root = parse_xml(b"<a><b>one</b><b>two</b><c x=\"1\"/></a>").unwrap();

        assert_eq!(root.name, "a");
        assert_eq!(root.children.len(), 3);
        let texts: Vec<&str> = root.children_named("b").map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert_eq!(root.child("c").unwrap().attribute("x"), Some("1"));
    }

    #[test]
    fn test_parse_entities_unescaped() {
        let root = parse_xml(b"<a>x &lt; y &amp; z</a>").unwrap();
        assert_eq!(root.text, "x < y & z");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_xml(b"<a><b></a></b>").is_err());
        assert!(parse_xml(b"").is_err());
    }

    #[test]
    fn test_prolog_skipped() {
        let root = parse_xml(b"<?xml version=\"1.0\"?><doc/>").unwrap();
        assert_eq!(root.name, "doc");
    }
}
