//! The YAML collaborator boundary.
//!
//! Builds a marked node tree (scalar / sequence / mapping, each with an
//! optional tag and a source span) from `yaml_rust2` parser events. The
//! engine consumes this tree instead of a resolved YAML value because it
//! needs custom tags and line/column information on every node.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::error::{Error, Result, SourceSpan};

#[derive(Debug, Clone)]
pub struct YamlNode {
    pub kind: NodeKind,
    pub tag: Option<String>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Scalar { text: String, quoted: bool },
    Seq(Vec<YamlNode>),
    Map(Vec<(YamlNode, YamlNode)>),
}

/// Parse the first document of `text` into a node tree.
pub fn parse_document(text: &str, file: &str) -> Result<YamlNode> {
    let mut builder = TreeBuilder::new(file);
    let mut parser = Parser::new_from_str(text);
    parser
        .load(&mut builder, false)
        .map_err(|err| {
            let marker = *err.marker();
            Error::yaml(
                err.to_string(),
                SourceSpan::new(file, marker.line(), marker.col() + 1),
            )
        })?;
    if let Some(err) = builder.error {
        return Err(err);
    }
    builder
        .root
        .ok_or_else(|| Error::yaml("empty document", SourceSpan::new(file, 1, 1)))
}

/// How a plain (unquoted, untagged) scalar resolves.
#[derive(Debug, Clone, PartialEq)]
pub enum PlainScalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str,
}

pub fn resolve_plain_scalar(text: &str) -> PlainScalar {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return PlainScalar::Null,
        "true" | "True" | "TRUE" => return PlainScalar::Bool(true),
        "false" | "False" | "FALSE" => return PlainScalar::Bool(false),
        ".inf" | "+.inf" => return PlainScalar::Float(f64::INFINITY),
        "-.inf" => return PlainScalar::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" => return PlainScalar::Float(f64::NAN),
        _ => {}
    }
    if let Ok(n) = text.parse::<i64>() {
        return PlainScalar::Int(n);
    }
    // Only attempt float resolution on number-shaped text, so strings like
    // `inf` or version labels stay strings.
    let number_shaped = text
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
        .unwrap_or(false)
        && text.chars().any(|c| c.is_ascii_digit());
    if number_shaped {
        if let Ok(x) = text.parse::<f64>() {
            return PlainScalar::Float(x);
        }
    }
    PlainScalar::Str
}

struct TreeBuilder {
    file: Rc<str>,
    stack: Vec<Frame>,
    root: Option<YamlNode>,
    anchors: FxHashMap<usize, YamlNode>,
    error: Option<Error>,
}

enum Frame {
    Seq {
        items: Vec<YamlNode>,
        tag: Option<String>,
        span: SourceSpan,
        anchor: usize,
    },
    Map {
        pairs: Vec<(YamlNode, YamlNode)>,
        pending_key: Option<YamlNode>,
        tag: Option<String>,
        span: SourceSpan,
        anchor: usize,
    },
}

impl TreeBuilder {
    fn new(file: &str) -> Self {
        TreeBuilder {
            file: Rc::from(file),
            stack: Vec::new(),
            root: None,
            anchors: FxHashMap::default(),
            error: None,
        }
    }

    fn span(&self, marker: Marker) -> SourceSpan {
        SourceSpan::new(self.file.clone(), marker.line(), marker.col() + 1)
    }

    fn push_value(&mut self, node: YamlNode) {
        match self.stack.last_mut() {
            Some(Frame::Seq { items, .. }) => items.push(node),
            Some(Frame::Map {
                pairs, pending_key, ..
            }) => match pending_key.take() {
                None => *pending_key = Some(node),
                Some(key) => pairs.push((key, node)),
            },
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
        }
    }

    fn remember_anchor(&mut self, anchor: usize, node: &YamlNode) {
        if anchor != 0 {
            self.anchors.insert(anchor, node.clone());
        }
    }
}

fn format_tag(tag: &Tag) -> String {
    if tag.handle == "!" {
        format!("!{}", tag.suffix)
    } else if tag.handle == "!!" || tag.handle == "tag:yaml.org,2002:" {
        format!("!!{}", tag.suffix)
    } else if tag.handle.is_empty() {
        tag.suffix.clone()
    } else {
        format!("{}{}", tag.handle, tag.suffix)
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }
        let span = self.span(marker);
        match event {
            Event::Scalar(text, style, anchor, tag) => {
                let node = YamlNode {
                    kind: NodeKind::Scalar {
                        text,
                        quoted: style != TScalarStyle::Plain,
                    },
                    tag: tag.as_ref().map(format_tag),
                    span,
                };
                self.remember_anchor(anchor, &node);
                self.push_value(node);
            }
            Event::SequenceStart(anchor, tag) => {
                self.stack.push(Frame::Seq {
                    items: Vec::new(),
                    tag: tag.as_ref().map(format_tag),
                    span,
                    anchor,
                });
            }
            Event::SequenceEnd => {
                if let Some(Frame::Seq {
                    items,
                    tag,
                    span,
                    anchor,
                }) = self.stack.pop()
                {
                    let node = YamlNode {
                        kind: NodeKind::Seq(items),
                        tag,
                        span,
                    };
                    self.remember_anchor(anchor, &node);
                    self.push_value(node);
                }
            }
            Event::MappingStart(anchor, tag) => {
                self.stack.push(Frame::Map {
                    pairs: Vec::new(),
                    pending_key: None,
                    tag: tag.as_ref().map(format_tag),
                    span,
                    anchor,
                });
            }
            Event::MappingEnd => {
                if let Some(Frame::Map {
                    pairs,
                    pending_key,
                    tag,
                    span,
                    anchor,
                }) = self.stack.pop()
                {
                    if pending_key.is_some() {
                        self.error = Some(Error::yaml("mapping key without a value", span));
                        return;
                    }
                    let node = YamlNode {
                        kind: NodeKind::Map(pairs),
                        tag,
                        span,
                    };
                    self.remember_anchor(anchor, &node);
                    self.push_value(node);
                }
            }
            Event::Alias(anchor) => match self.anchors.get(&anchor) {
                Some(node) => {
                    let node = node.clone();
                    self.push_value(node);
                }
                None => {
                    self.error = Some(Error::yaml("alias to unknown anchor", span));
                }
            },
            Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd
            | Event::Nothing => {}
        }
    }
}
