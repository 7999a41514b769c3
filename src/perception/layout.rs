/// Typed model of a `uiautomator` layout dump.
///
/// The dump is an XML document with a `hierarchy` root holding nested `node`
/// elements. It is parsed once per fetch into an owned tree of [`LayoutNode`]s
/// and walked with an explicit worklist, so extraction never recurses on the
/// raw document.
use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::{DroidClawError, DroidClawResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutNode {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<LayoutNode>,
}

impl LayoutNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Pre-order iterator over this node and all of its descendants.
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter { stack: vec![self] }
    }
}

pub struct NodeIter<'a> {
    stack: Vec<&'a LayoutNode>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a LayoutNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reverse so the first child is visited first.
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// One parsed layout dump. Owned by the fetcher's caller for a single turn.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTree {
    pub root: LayoutNode,
}

impl LayoutTree {
    pub fn parse(xml: &str) -> DroidClawResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut open: Vec<LayoutNode> = Vec::new();
        let mut root: Option<LayoutNode> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => open.push(node_from_start(&e)?),
                Event::Empty(e) => {
                    let node = node_from_start(&e)?;
                    attach(&mut open, &mut root, node)?;
                }
                Event::End(_) => {
                    let node = open.pop().ok_or_else(|| {
                        DroidClawError::Layout("closing tag without an open element".into())
                    })?;
                    attach(&mut open, &mut root, node)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !open.is_empty() {
            return Err(DroidClawError::Layout(format!(
                "{} element(s) left unclosed",
                open.len()
            )));
        }
        root.map(|root| Self { root })
            .ok_or_else(|| DroidClawError::Layout("document has no root element".into()))
    }

    /// The `hierarchy` element: the document root itself, or the first one found below it.
    pub fn hierarchy(&self) -> Option<&LayoutNode> {
        self.root.iter().find(|n| n.tag == "hierarchy")
    }
}

fn node_from_start(e: &BytesStart<'_>) -> DroidClawResult<LayoutNode> {
    let mut node = LayoutNode::new(String::from_utf8_lossy(e.name().as_ref()));
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        node.attributes.insert(key, value);
    }
    Ok(node)
}

fn attach(
    open: &mut [LayoutNode],
    root: &mut Option<LayoutNode>,
    node: LayoutNode,
) -> DroidClawResult<()> {
    if let Some(parent) = open.last_mut() {
        parent.children.push(node);
        Ok(())
    } else if root.is_none() {
        *root = Some(node);
        Ok(())
    } else {
        Err(DroidClawError::Layout("more than one root element".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<hierarchy rotation="0">
  <node index="0" text="" class="android.widget.FrameLayout" bounds="[0,0][1080,2400]">
    <node index="0" text="Search &amp; go" resource-id="com.app:id/search" class="android.widget.EditText" bounds="[40,120][1040,220]" />
    <node index="1" text="" class="android.widget.LinearLayout" bounds="[0,300][1080,900]">
      <node index="0" text="Settings" class="android.widget.TextView" bounds="[60,320][400,380]" />
    </node>
  </node>
</hierarchy>"#;

    #[test]
    fn parses_nested_nodes_and_unescapes_attributes() {
        let tree = LayoutTree::parse(DUMP).unwrap();
        assert_eq!(tree.root.tag, "hierarchy");
        assert_eq!(tree.root.attr("rotation"), Some("0"));

        let frame = &tree.root.children[0];
        assert_eq!(frame.children.len(), 2);
        assert_eq!(frame.children[0].attr("text"), Some("Search & go"));
        assert_eq!(frame.children[0].attr("resource-id"), Some("com.app:id/search"));
    }

    #[test]
    fn iteration_is_pre_order() {
        let tree = LayoutTree::parse(DUMP).unwrap();
        let order: Vec<&str> = tree
            .root
            .iter()
            .filter_map(|n| n.attr("class"))
            .collect();
        assert_eq!(
            order,
            vec![
                "android.widget.FrameLayout",
                "android.widget.EditText",
                "android.widget.LinearLayout",
                "android.widget.TextView",
            ]
        );
    }

    #[test]
    fn hierarchy_found_below_wrapper_root() {
        let tree = LayoutTree::parse("<dump><hierarchy><node/></hierarchy></dump>").unwrap();
        assert_eq!(tree.hierarchy().map(|h| h.children.len()), Some(1));

        let tree = LayoutTree::parse("<dump><node/></dump>").unwrap();
        assert!(tree.hierarchy().is_none());
    }

    #[test]
    fn malformed_documents_are_errors() {
        assert!(LayoutTree::parse("").is_err());
        assert!(LayoutTree::parse("<hierarchy><node></hierarchy>").is_err());
        assert!(LayoutTree::parse("<hierarchy>").is_err());
        assert!(LayoutTree::parse("<a/><b/>").is_err());
    }
}
