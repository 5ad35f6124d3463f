//! Document rewrite pass.
//!
//! Walks a parsed HTML document and rewrites asset references in place:
//! - `href` on any element carrying `href` or `link`, when the value looks
//!   like a file (has an extension) and is not excluded
//! - `src` on `img` and `script`, when not excluded

use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_document, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::io;
use std::time::Instant;

use crate::observability::metrics;
use crate::rewrite::urls::has_file_extension;
use crate::rewrite::{CdnRewriter, SiteContext};

/// Counters from one document pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentStats {
    /// Candidate attributes inspected.
    pub examined: usize,
    /// Attributes whose value changed.
    pub rewritten: usize,
}

/// Parse an HTML5 document.
pub fn parse_html(html: &str) -> RcDom {
    parse_document(RcDom::default(), ParseOpts::default()).one(html)
}

/// Serialize a document back to HTML text, `<template>` contents included.
pub fn serialize_html(dom: &RcDom) -> io::Result<String> {
    let mut out = Vec::new();
    serialize(&mut out, &Tree(dom.document.clone()), SerializeOpts::default())?;
    String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Serializable node. Template contents live in a separate fragment that
/// the stock rcdom handle skips, so they are emitted here as the
/// template's children.
struct Tree(Handle);

enum Op {
    Open(Handle),
    Close(QualName),
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()> {
        let mut ops = match traversal_scope {
            TraversalScope::IncludeNode => vec![Op::Open(self.0.clone())],
            TraversalScope::ChildrenOnly(_) => children(&self.0),
        };

        while let Some(op) = ops.pop() {
            let node = match op {
                Op::Open(node) => node,
                Op::Close(name) => {
                    serializer.end_elem(name)?;
                    continue;
                }
            };

            match node.data {
                NodeData::Element {
                    ref name,
                    ref attrs,
                    ref template_contents,
                    ..
                } => {
                    serializer.start_elem(
                        name.clone(),
                        attrs.borrow().iter().map(|a| (&a.name, &a.value[..])),
                    )?;
                    ops.push(Op::Close(name.clone()));
                    ops.extend(children(&node));
                    if let Some(contents) = template_contents.borrow().as_ref() {
                        ops.extend(children(contents));
                    }
                }
                NodeData::Document => ops.extend(children(&node)),
                NodeData::Doctype { ref name, .. } => serializer.write_doctype(name)?,
                NodeData::Text { ref contents } => serializer.write_text(&contents.borrow())?,
                NodeData::Comment { ref contents } => serializer.write_comment(contents)?,
                NodeData::ProcessingInstruction {
                    ref target,
                    ref contents,
                } => serializer.write_processing_instruction(target, contents)?,
            }
        }
        Ok(())
    }
}

/// Children of `node` as open ops, last child first so they pop in order.
fn children(node: &Handle) -> Vec<Op> {
    node.children.borrow().iter().rev().cloned().map(Op::Open).collect()
}

/// Rewrite qualifying attributes of `dom` for `site`.
pub fn rewrite_document(dom: &RcDom, rewriter: &CdnRewriter, site: &SiteContext) -> DocumentStats {
    let started = Instant::now();
    let mut stats = DocumentStats::default();
    let mut stack = vec![dom.document.clone()];

    while let Some(node) = stack.pop() {
        if let NodeData::Element {
            ref name,
            ref attrs,
            ref template_contents,
            ..
        } = node.data
        {
            let mut attrs = attrs.borrow_mut();

            let carries_link = attrs
                .iter()
                .any(|a| matches!(&*a.name.local, "href" | "link"));
            if carries_link {
                if let Some(attr) = attrs.iter_mut().find(|a| &*a.name.local == "href") {
                    stats.examined += 1;
                    let href = attr.value.to_string();
                    if !href.is_empty() && !rewriter.is_url_excluded(&href) && has_file_extension(&href) {
                        let replaced = rewriter.rewrite_for_site(&href, site);
                        tracing::debug!(current = %href, new = %replaced, "href");
                        if replaced != href {
                            attr.value = StrTendril::from_slice(&replaced);
                            stats.rewritten += 1;
                        }
                    }
                }
            }

            if matches!(&*name.local, "img" | "script") {
                if let Some(attr) = attrs.iter_mut().find(|a| &*a.name.local == "src") {
                    stats.examined += 1;
                    let src = attr.value.to_string();
                    if !src.is_empty() && !rewriter.is_url_excluded(&src) {
                        let replaced = rewriter.rewrite_for_site(&src, site);
                        tracing::debug!(current = %src, new = %replaced, "src");
                        if replaced != src {
                            attr.value = StrTendril::from_slice(&replaced);
                            stats.rewritten += 1;
                        }
                    }
                }
            }

            if let Some(contents) = template_contents.borrow().as_ref() {
                stack.push(contents.clone());
            }
        }

        stack.extend(node.children.borrow().iter().rev().cloned());
    }

    let elapsed = started.elapsed();
    tracing::debug!(
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        examined = stats.examined,
        rewritten = stats.rewritten,
        "replaceMediaUrls"
    );
    metrics::record_document_pass(elapsed, stats.rewritten);
    stats
}
