//! Chunk-by-chunk driver.
//!
//! Segments the document, then for each chunk in order: build the request
//! from the current history, send it, write the response, and record it in
//! history before moving to the next chunk. One request is in flight at a
//! time.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use docrelay_ingest::Segmenter;
use docrelay_llm::{ContextPolicy, HistoryStore, RequestBuilder, StatusObserver, Transport};
use tracing::info;

use crate::archive::ChunkArchive;

/// Separator written after every chunk's response.
const RESPONSE_SEPARATOR: &[u8] = b"\n\n";

pub struct PipelineSettings {
    pub system_prompt: String,
    pub max_words: usize,
    pub policy: ContextPolicy,
    /// Token budget per request.
    pub context_tokens: usize,
    /// Append each chunk to user history after it is processed.
    pub echo_inputs: bool,
    /// Verb for status lines ("Processing", "Translating").
    pub verb: &'static str,
    /// Past tense for the per-chunk success line ("processed", "translated").
    pub done: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub chunks: usize,
    /// Chunks whose output is a terminal error string.
    pub failed_chunks: usize,
    pub archived: usize,
}

pub struct Pipeline {
    settings: PipelineSettings,
    segmenter: Segmenter,
    builder: RequestBuilder,
    transport: Transport,
    observer: Arc<dyn StatusObserver>,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        transport: Transport,
        observer: Arc<dyn StatusObserver>,
    ) -> Self {
        Self {
            segmenter: Segmenter::new(settings.max_words),
            builder: RequestBuilder::new(observer.clone()),
            settings,
            transport,
            observer,
        }
    }

    /// Process `document`, streaming responses to `sink`.
    ///
    /// Failed requests do not stop the run; their error text is written in
    /// place of the response. Only a failure to write `sink` aborts.
    pub async fn run<W: Write>(
        &self,
        document: &str,
        history: &mut HistoryStore,
        sink: &mut W,
        archive: Option<&ChunkArchive>,
    ) -> Result<RunSummary> {
        let chunks = self.segmenter.split(document);
        let total = chunks.len();
        self.observer
            .notify(&format!("Document split into {total} chunks"), false);

        let mut summary = RunSummary {
            chunks: total,
            ..RunSummary::default()
        };

        for (i, chunk) in chunks.iter().enumerate() {
            let index = i + 1;
            self.observer.notify(
                &format!("{} chunk {index}/{total}...", self.settings.verb),
                false,
            );

            let messages = self.builder.build(
                &self.settings.system_prompt,
                history,
                self.settings.policy,
                chunk,
                self.settings.context_tokens,
            );
            let delivery = self.transport.send_detailed(&messages).await;

            sink.write_all(delivery.text.as_bytes())
                .and_then(|_| sink.write_all(RESPONSE_SEPARATOR))
                .and_then(|_| sink.flush())
                .with_context(|| format!("failed to write output for chunk {index}"))?;

            if let Some(archive) = archive {
                if archive.store(index, &delivery.text) {
                    summary.archived += 1;
                }
            }

            if delivery.outcome.is_failure() {
                summary.failed_chunks += 1;
                self.observer.notify(
                    &format!(
                        "Chunk {index}/{total} failed after {} attempts; error written to output",
                        delivery.outcome.attempts()
                    ),
                    true,
                );
            } else {
                self.observer.notify(
                    &format!("✓ Chunk {index}/{total} {} successfully", self.settings.done),
                    false,
                );
            }

            history.append_response(delivery.text);
            if self.settings.echo_inputs {
                history.append_input_echo(chunk.as_str());
            }
        }

        info!(
            chunks = summary.chunks,
            failed = summary.failed_chunks,
            archived = summary.archived,
            "Run finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use docrelay_llm::providers::mock::MockProvider;
    use docrelay_llm::status::MemoryObserver;
    use docrelay_llm::{HeuristicEstimator, Message, RetryPolicy, Role};

    use super::*;

    fn pipeline(
        provider: Arc<MockProvider>,
        policy: ContextPolicy,
        echo_inputs: bool,
        max_retries: u32,
    ) -> (Pipeline, Arc<MemoryObserver>) {
        let observer = Arc::new(MemoryObserver::new());
        let transport = Transport::new(
            provider,
            RetryPolicy::new(max_retries, Duration::from_secs(1)),
            observer.clone(),
        );
        let settings = PipelineSettings {
            system_prompt: "You are a careful editor.".into(),
            max_words: 10,
            policy,
            context_tokens: 20_000,
            echo_inputs,
            verb: "Processing",
            done: "processed",
        };
        (Pipeline::new(settings, transport, observer.clone()), observer)
    }

    fn history() -> HistoryStore {
        HistoryStore::new(Arc::new(HeuristicEstimator))
    }

    const DOC: &str = "one two three four\n\nfive six seven eight\n\nnine ten eleven twelve";

    #[tokio::test(start_paused = true)]
    async fn writes_responses_in_chunk_order() {
        let provider = Arc::new(MockProvider::new());
        let (p, observer) = pipeline(provider.clone(), ContextPolicy::AssistantOnly, false, 2);
        let mut history = history();
        let mut out = Vec::new();

        let summary = p.run(DOC, &mut history, &mut out, None).await.unwrap();

        assert_eq!(summary, RunSummary { chunks: 2, failed_chunks: 0, archived: 0 });
        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            out,
            "processed: one two three four\n\nfive six seven eight\n\n\n\n\
             processed: nine ten eleven twelve\n\n\n\n"
        );
        assert_eq!(history.assistant_len(), 2);
        assert_eq!(history.user_len(), 0);
        assert_eq!(observer.starting_with("Document split into 2 chunks").len(), 1);
        assert_eq!(observer.starting_with("Processing chunk ").len(), 2);
        assert_eq!(
            observer.starting_with("✓ Chunk 2/2 processed successfully").len(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn assistant_context_feeds_next_request() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_ok("cleaned first");
        provider.queue_ok("cleaned second");
        let (p, _) = pipeline(provider.clone(), ContextPolicy::AssistantOnly, false, 2);

        p.run(DOC, &mut history(), &mut Vec::new(), None).await.unwrap();

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].len(), 2);
        assert_eq!(
            calls[1],
            vec![
                Message::system("You are a careful editor."),
                Message::assistant("cleaned first"),
                Message::user("nine ten eleven twelve\n\n"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn combined_context_includes_source_echo() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_ok("première partie");
        let (p, _) = pipeline(provider.clone(), ContextPolicy::Combined, true, 2);
        let mut history = history();

        p.run(DOC, &mut history, &mut Vec::new(), None).await.unwrap();

        let second = &provider.calls()[1];
        let roles: Vec<Role> = second.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(second[1].content, "one two three four\n\nfive six seven eight\n\n");
        assert_eq!(second[2].content, "première partie");
        assert_eq!(history.user_len(), 2);
        assert_eq!(history.assistant_len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_chunk_degrades_and_run_continues() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_unavailable(3);
        provider.queue_ok("second ok");
        let (p, observer) = pipeline(provider.clone(), ContextPolicy::AssistantOnly, false, 2);
        let mut history = history();
        let mut out = Vec::new();

        let summary = p.run(DOC, &mut history, &mut out, None).await.unwrap();

        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.failed_chunks, 1);
        assert_eq!(provider.call_count(), 4);
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Error occurred after 3 attempts: API request failed with status 503"));
        assert!(out.ends_with("second ok\n\n"));
        assert_eq!(observer.starting_with("Chunk 1/2 failed after 3 attempts").len(), 1);
        // The degraded chunk still occupies its slot in history.
        assert_eq!(history.assistant_len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn archives_each_response() {
        let provider = Arc::new(MockProvider::new());
        let (p, observer) = pipeline(provider, ContextPolicy::AssistantOnly, false, 0);
        let archive = ChunkArchive::create(ChunkArchive::default_dir(), 3, observer).unwrap();

        let summary = p
            .run(DOC, &mut history(), &mut Vec::new(), Some(&archive))
            .await
            .unwrap();

        assert_eq!(summary.archived, 2);
        let second = std::fs::read_to_string(archive.path_for(2)).unwrap();
        assert_eq!(second, "processed: nine ten eleven twelve\n\n");
        std::fs::remove_dir_all(archive.dir()).ok();
    }

    #[tokio::test(start_paused = true)]
    async fn empty_document_sends_nothing() {
        let provider = Arc::new(MockProvider::new());
        let (p, _) = pipeline(provider.clone(), ContextPolicy::AssistantOnly, false, 2);
        let mut out = Vec::new();

        let summary = p.run("\n\n  \n\n", &mut history(), &mut out, None).await.unwrap();

        assert_eq!(summary, RunSummary::default());
        assert_eq!(provider.call_count(), 0);
        assert!(out.is_empty());
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn output_write_failure_aborts() {
        let provider = Arc::new(MockProvider::new());
        let (p, _) = pipeline(provider.clone(), ContextPolicy::AssistantOnly, false, 2);

        let err = p
            .run(DOC, &mut history(), &mut BrokenSink, None)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("disk full"));
        assert_eq!(provider.call_count(), 1);
    }
}
