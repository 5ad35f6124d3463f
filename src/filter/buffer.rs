//! Buffering output filter.
//!
//! Holds every write until the closing `</html>` is seen, then rewrites the
//! whole document once and writes it downstream. Everything after that goes
//! straight through.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::mem;
use std::sync::Arc;
use thiserror::Error;

use crate::observability::metrics;
use crate::rewrite::{parse_html, rewrite_document, serialize_html, CdnRewriter, SiteContext};

/// Terminal marker, matched case-insensitively.
const MARKER: &[u8] = b"</html>";

/// Errors from the one-shot document transform.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Buffered bytes are not UTF-8.
    #[error("Buffered document is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    /// The rewritten document could not be serialized.
    #[error("Failed to serialize rewritten document: {0}")]
    Serialize(io::Error),
}

impl FilterError {
    fn reason(&self) -> &'static str {
        match self {
            FilterError::Decode(_) => "decode",
            FilterError::Serialize(_) => "serialize",
        }
    }
}

/// Observable filter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    Buffering,
    Flushed,
}

enum State {
    Buffering(Vec<u8>),
    Flushed,
}

/// Output sink that rewrites a complete HTML document before passing it on.
pub struct ResponseFilter<W: Write> {
    downstream: W,
    rewriter: Arc<CdnRewriter>,
    site: SiteContext,
    state: State,
}

impl<W: Write> ResponseFilter<W> {
    pub fn new(downstream: W, rewriter: Arc<CdnRewriter>, site: SiteContext) -> Self {
        Self {
            downstream,
            rewriter,
            site,
            state: State::Buffering(Vec::new()),
        }
    }

    pub fn state(&self) -> FilterState {
        match self.state {
            State::Buffering(_) => FilterState::Buffering,
            State::Flushed => FilterState::Flushed,
        }
    }

    /// Bytes held while buffering.
    pub fn buffered_len(&self) -> usize {
        match &self.state {
            State::Buffering(buffer) => buffer.len(),
            State::Flushed => 0,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.downstream
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.downstream
    }

    /// Flush anything still buffered downstream verbatim. The filter is
    /// `Flushed` afterwards.
    pub fn close(&mut self) -> io::Result<()> {
        if let State::Buffering(_) = self.state {
            let buffered = self.take_buffer();
            if !buffered.is_empty() {
                tracing::debug!(bytes = buffered.len(), "Response ended without </html>, passing through");
                metrics::record_filter_fallback("unterminated");
            }
            self.downstream.write_all(&buffered)?;
        }
        self.downstream.flush()
    }

    /// Close the filter and hand back the downstream sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.close()?;
        Ok(self.downstream)
    }

    fn take_buffer(&mut self) -> Vec<u8> {
        match mem::replace(&mut self.state, State::Flushed) {
            State::Buffering(buffer) => buffer,
            State::Flushed => Vec::new(),
        }
    }

    fn transform(&self, document: &[u8]) -> Result<Vec<u8>, FilterError> {
        let text = std::str::from_utf8(document)?;
        let dom = parse_html(text);
        rewrite_document(&dom, &self.rewriter, &self.site);
        let html = serialize_html(&dom).map_err(FilterError::Serialize)?;
        Ok(html.into_bytes())
    }
}

impl ResponseFilter<Vec<u8>> {
    /// Drain what has been written downstream so far.
    pub fn take_output(&mut self) -> Vec<u8> {
        mem::take(&mut self.downstream)
    }
}

impl<W: Write> Write for ResponseFilter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let end = match &mut self.state {
            State::Flushed => {
                self.downstream.write_all(buf)?;
                return Ok(buf.len());
            }
            State::Buffering(buffer) => {
                // The marker may straddle the previous write.
                let search_from = buffer.len().saturating_sub(MARKER.len() - 1);
                buffer.extend_from_slice(buf);
                match find_marker(&buffer[search_from..]) {
                    Some(at) => search_from + at + MARKER.len(),
                    None => return Ok(buf.len()),
                }
            }
        };

        let mut document = self.take_buffer();
        let remainder = document.split_off(end);

        let output = match self.transform(&document) {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(
                    cdn_hostname = %self.site.cdn_hostname,
                    language = %self.site.language,
                    error = %e,
                    "Document rewrite failed, passing response through"
                );
                metrics::record_filter_fallback(e.reason());
                document
            }
        };

        self.downstream.write_all(&output)?;
        self.downstream.write_all(&remainder)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.downstream.flush()
    }
}

impl<W: Write + Read> Read for ResponseFilter<W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.downstream.read(buf)
    }
}

impl<W: Write + Seek> Seek for ResponseFilter<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.downstream.seek(pos)
    }
}

fn find_marker(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(MARKER.len())
        .position(|window| window.eq_ignore_ascii_case(MARKER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::testing::{photo, rewriter, rewriter_with_patterns, FakeContent, FakeFiles};
    use crate::rewrite::{RewritePatterns, RewriteSettings};
    use std::io::Cursor;

    const CDN: &str = "cdn.example.com";

    /// Downstream that records each write call separately.
    #[derive(Default)]
    struct Recorder {
        writes: Vec<Vec<u8>>,
    }

    impl Write for Recorder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn filter<W: Write>(downstream: W) -> ResponseFilter<W> {
        let rewriter = Arc::new(rewriter_with_patterns(RewritePatterns::default()));
        let site = rewriter.site_context(CDN, None);
        ResponseFilter::new(downstream, rewriter, site)
    }

    #[test]
    fn test_buffers_until_marker_then_passes_through() {
        let mut filter = filter(Recorder::default());

        filter.write_all(b"<html><body>").unwrap();
        filter.write_all(b"<img src=/a.png>").unwrap();
        assert!(filter.get_ref().writes.is_empty());
        assert_eq!(filter.state(), FilterState::Buffering);

        filter.write_all(b"</html>").unwrap();
        assert_eq!(filter.state(), FilterState::Flushed);
        assert_eq!(filter.get_ref().writes.len(), 1);
        let document = String::from_utf8(filter.get_ref().writes[0].clone()).unwrap();
        assert!(document.contains(r#"<img src="https://cdn.example.com/a.png">"#));
        assert!(document.ends_with("</html>"));

        filter.write_all(b"extra").unwrap();
        assert_eq!(filter.get_ref().writes.len(), 2);
        assert_eq!(filter.get_ref().writes[1], b"extra");
    }

    #[test]
    fn test_close_flushes_unterminated_buffer_verbatim() {
        let mut filter = filter(Vec::new());
        filter.write_all(b"<html><body>no close tag").unwrap();
        assert!(filter.get_ref().is_empty());

        let out = filter.finish().unwrap();
        assert_eq!(out, b"<html><body>no close tag");
    }

    #[test]
    fn test_close_after_flush_writes_nothing_more() {
        let mut filter = filter(Vec::new());
        filter.write_all(b"<html><body></body></html>").unwrap();
        let written = filter.get_ref().len();

        filter.close().unwrap();
        filter.close().unwrap();
        assert_eq!(filter.get_ref().len(), written);
    }

    #[test]
    fn test_invalid_utf8_passes_through() {
        let mut filter = filter(Vec::new());
        let body = b"<html><body>\xff\xfe<img src=/a.png></body></html>";

        filter.write_all(body).unwrap();
        assert_eq!(filter.state(), FilterState::Flushed);
        assert_eq!(filter.get_ref().as_slice(), body.as_slice());
    }

    #[test]
    fn test_marker_split_across_writes() {
        let mut filter = filter(Vec::new());
        filter.write_all(b"<html><body><img src=/a.png></body></ht").unwrap();
        assert_eq!(filter.state(), FilterState::Buffering);

        filter.write_all(b"ml>").unwrap();
        assert_eq!(filter.state(), FilterState::Flushed);
        let out = String::from_utf8(filter.take_output()).unwrap();
        assert!(out.contains("https://cdn.example.com/a.png"));
    }

    #[test]
    fn test_marker_is_case_insensitive_and_remainder_follows() {
        let mut filter = filter(Vec::new());
        filter.write_all(b"<HTML><BODY><script src=/app.js></script></BODY></HTML>\n<!-- tail -->").unwrap();

        let out = String::from_utf8(filter.take_output()).unwrap();
        assert!(out.contains(r#"src="https://cdn.example.com/app.js""#));
        assert!(out.ends_with("</html>\n<!-- tail -->"));
    }

    #[test]
    fn test_template_contents_survive_rewrite() {
        let mut filter = filter(Vec::new());
        filter
            .write_all(b"<html><body><template id=\"row\"><tr><td><img src=/a.png></td></tr></template></body></html>")
            .unwrap();

        let out = String::from_utf8(filter.take_output()).unwrap();
        assert!(out.contains(r#"<template id="row"><tr><td><img src="https://cdn.example.com/a.png"></td></tr></template>"#));
    }

    #[test]
    fn test_document_rewritten_in_site_language() {
        let (mut item, public) = photo(2, true);
        item.language = "de".to_string();
        let rewriter = Arc::new(rewriter(
            FakeContent::with_items(vec![(item, public)]),
            FakeFiles::default(),
            RewriteSettings::default(),
        ));
        let site = SiteContext::new(CDN, "de");
        let mut filter = ResponseFilter::new(Vec::new(), rewriter, site);

        filter.write_all(b"<html><body><img src=/~/media/img/photo.ashx></body></html>").unwrap();
        let out = String::from_utf8(filter.take_output()).unwrap();
        assert!(out.contains(r#"src="https://cdn.example.com/~/media/img/photo.ashx?vs=2&amp;d=20130101T000000""#));
    }

    #[test]
    fn test_read_and_seek_pass_through() {
        let mut filter = filter(Cursor::new(Vec::new()));
        filter.write_all(b"<html></html>").unwrap();

        filter.seek(SeekFrom::Start(0)).unwrap();
        let mut text = String::new();
        filter.read_to_string(&mut text).unwrap();
        assert!(text.starts_with("<html>"));
    }
}
