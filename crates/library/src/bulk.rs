use crate::MAX_PROCESS_CONCURRENCY;
use crate::error::{ErrorKind, Result};
use crate::process::{Outcome, Processor};
use crate::vault::Document;
use async_stream::stream;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt, TryStreamExt};
use mdlocal_config::IncludePattern;

/// Progress events emitted by [`process_all`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete), exactly once, with the
///    number of matching documents.
/// 3. [`Processed`](Self::Processed), once per document.
/// 4. [`Complete`](Self::Complete), exactly once.
///
/// A failed discovery terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessEvent {
    Started,
    DiscoveryComplete(u64),
    Processed(Document, Outcome),
    Complete,
}

/// Streams [`ProcessEvent`]s while every document matching `include` is
/// processed, up to [`MAX_PROCESS_CONCURRENCY`] at a time.
///
/// A failing document surfaces as an [`ErrorKind::Document`] item without
/// ending the stream.
pub fn process_all<'a>(
    processor: &'a Processor,
    include: &'a IncludePattern,
) -> impl Stream<Item = Result<ProcessEvent>> + 'a {
    stream!({
        yield Ok(ProcessEvent::Started);

        let documents: Vec<Document> = match processor.vault().list_documents(include).try_collect().await {
            Ok(documents) => documents,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        yield Ok(ProcessEvent::DiscoveryComplete(u64::try_from(documents.len()).unwrap_or(u64::MAX)));

        let mut pending = documents.into_iter().map(|document| async move {
            match processor.process(&document).await {
                Ok(outcome) => Ok(ProcessEvent::Processed(document, outcome)),
                Err(e) => Err(e).or_raise(|| ErrorKind::Document(document.to_string())),
            }
        });
        let mut processing: FuturesUnordered<_> = pending.by_ref().take(MAX_PROCESS_CONCURRENCY).collect();
        while let Some(result) = processing.next().await {
            yield result;
            if let Some(next) = pending.next() {
                processing.push(next);
            }
        }

        yield Ok(ProcessEvent::Complete);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LinkHashCache;
    use crate::materialize::Materializer;
    use crate::vault::Vault;
    use mdlocal_fetch::MockFetcher;
    use mdlocal_storage::backend::MockBackend;
    use std::sync::Arc;

    fn processor(files: Vec<(String, Vec<u8>)>) -> Processor {
        let backend = Arc::new(MockBackend::with_files(files));
        let fetcher = Arc::new(MockFetcher::with_responses([("http://x/1.png", b"\x89PNG\r\n\x1a\n".to_vec())]));
        let materializer = Materializer::new(fetcher, backend.clone(), Arc::new(LinkHashCache::new()));
        Processor::new(Vault::new(backend, "media"), materializer, true)
    }

    #[tokio::test]
    async fn test_event_order() {
        let processor = processor(vec![
            ("a.md".to_string(), b"![a](http://x/1.png)".to_vec()),
            ("b.md".to_string(), b"nothing".to_vec()),
            ("c.txt".to_string(), b"![c](http://x/1.png)".to_vec()),
        ]);
        let include = IncludePattern::new(r".*\.md").unwrap();
        let events: Vec<_> = process_all(&processor, &include).try_collect().await.unwrap();

        assert_eq!(events.first(), Some(&ProcessEvent::Started));
        assert_eq!(events.get(1), Some(&ProcessEvent::DiscoveryComplete(2)));
        assert_eq!(events.last(), Some(&ProcessEvent::Complete));
        let processed: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                ProcessEvent::Processed(document, outcome) => Some((document.to_string(), *outcome)),
                _ => None,
            })
            .collect();
        assert_eq!(processed.len(), 2);
        assert!(processed.contains(&("a.md".to_string(), Outcome::Updated { replaced: 1, cleaned: false })));
        assert!(processed.contains(&("b.md".to_string(), Outcome::Unchanged)));
    }

    #[tokio::test]
    async fn test_more_documents_than_concurrency() {
        let count = MAX_PROCESS_CONCURRENCY * 2 + 3;
        let files = (0..count).map(|i| (format!("notes/{i}.md"), b"plain".to_vec())).collect();
        let processor = processor(files);
        let include = IncludePattern::new(r".*\.md").unwrap();
        let events: Vec<_> = process_all(&processor, &include).try_collect().await.unwrap();
        let processed = events.iter().filter(|event| matches!(event, ProcessEvent::Processed(..))).count();
        assert_eq!(processed, count);
    }

    #[tokio::test]
    async fn test_failing_document_does_not_stop_stream() {
        let processor = processor(vec![
            ("bad.md".to_string(), b"\xFF\xFE".to_vec()),
            ("good.md".to_string(), b"![a](http://x/1.png)".to_vec()),
        ]);
        let include = IncludePattern::new(r".*\.md").unwrap();
        let results: Vec<_> = process_all(&processor, &include).collect().await;

        let errors: Vec<_> = results.iter().filter_map(|result| result.as_ref().err()).collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&**errors[0], ErrorKind::Document(path) if path == "bad.md"));
        assert!(matches!(results.last(), Some(Ok(ProcessEvent::Complete))));
    }
}
