//! Async body adapter around [`ResponseFilter`].

use axum::body::{Body, BodyDataStream, Bytes};
use futures_util::StreamExt;
use std::io::{self, Write};
use std::sync::Arc;

use crate::filter::ResponseFilter;
use crate::rewrite::{CdnRewriter, SiteContext};

type Pending = (BodyDataStream, ResponseFilter<Vec<u8>>);

/// Wrap an upstream HTML body so that it is rewritten for `site`.
///
/// Chunks are fed to the filter as they arrive; whatever the filter has
/// written downstream is emitted right away, and the rest at end of stream.
pub fn rewrite_body(body: Body, rewriter: Arc<CdnRewriter>, site: SiteContext) -> Body {
    let filter = ResponseFilter::new(Vec::new(), rewriter, site);
    let stream = futures_util::stream::unfold(Some((body.into_data_stream(), filter)), |pending| async move {
        next_chunk(pending?).await
    });
    Body::from_stream(stream)
}

async fn next_chunk((mut stream, mut filter): Pending) -> Option<(io::Result<Bytes>, Option<Pending>)> {
    loop {
        match stream.next().await {
            Some(Ok(chunk)) => {
                if let Err(e) = filter.write_all(&chunk) {
                    return Some((Err(e), None));
                }
                let output = filter.take_output();
                if !output.is_empty() {
                    return Some((Ok(Bytes::from(output)), Some((stream, filter))));
                }
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Upstream body error");
                return Some((Err(io::Error::other(e)), None));
            }
            None => {
                return match filter.finish() {
                    Ok(rest) if rest.is_empty() => None,
                    Ok(rest) => Some((Ok(Bytes::from(rest)), None)),
                    Err(e) => Some((Err(e), None)),
                };
            }
        }
    }
}
