//! Page-by-page orchestration of a job.
//!
//! `Idle → Splitting → ExtractingPage(i) → Matching → PatternDetecting → Aggregating →
//! Rendering → Done`, with `Failed` and `Cancelled` reachable from any in-flight state.
//! Pages are extracted by a bounded worker pool (one worker means strictly sequential) and
//! re-sorted by page index before anything looks at them as a whole.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use docveil_extract::{ExtractionChain, ExtractionFailure, ExtractionMode, PageExtraction};
use docveil_pdf::{split_pages, SplitFailed};
use docveil_render::{render_redactions, RedactedArtifact, RenderError};
use docveil_rules::{detect_patterns, merge_pattern_fields, MatchSession};
use docveil_types::{
    ConfiguredDataElement, ExtractedField, MatchResult, PageDocument, PipelineProgress,
    RedactionSelection, SourceDocument,
};
use docveil_verify::{verify_artifact, VerifyResult};
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::error::{ConfigError, PipelineError};
use crate::selection::auto_select;
use crate::state::PipelineState;

pub type ProgressSender = mpsc::UnboundedSender<PipelineProgress>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A document plus the elements to look for. Elements travel with the job.
#[derive(Debug, Clone)]
pub struct PipelineJob {
    pub document: SourceDocument,
    pub elements: Vec<ConfiguredDataElement>,
    /// Overrides the configured mode.
    pub mode: Option<ExtractionMode>,
    /// Caller-chosen field ids and manual regions.
    pub selection: RedactionSelection,
    /// Also select fields whose element action redacts.
    pub auto_select: bool,
    /// Produce a redacted artifact.
    pub render: bool,
}

impl PipelineJob {
    pub fn new(document: SourceDocument, elements: Vec<ConfiguredDataElement>) -> Self {
        Self {
            document,
            elements,
            mode: None,
            selection: RedactionSelection::default(),
            auto_select: true,
            render: false,
        }
    }

    pub fn with_mode(mut self, mode: ExtractionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_selection(mut self, selection: RedactionSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn rendered(mut self) -> Self {
        self.render = true;
        self
    }
}

/// Everything a job produced. Failed and cancelled jobs keep what was extracted before they
/// stopped.
#[derive(Debug)]
pub struct JobResult {
    pub state: PipelineState,
    /// Successful page extractions ordered by page index.
    pub pages: Vec<PageExtraction>,
    /// Extracted plus supplementary pattern fields, ordered by page index.
    pub fields: Vec<ExtractedField>,
    pub matches: Vec<MatchResult>,
    pub selection: RedactionSelection,
    pub artifact: Option<RedactedArtifact>,
    pub verification: Option<VerifyResult>,
    pub split_warning: Option<SplitFailed>,
    /// Extraction failures of individual pages, ordered by page index.
    pub page_failures: Vec<ExtractionFailure>,
    pub error: Option<PipelineError>,
    /// Rendering failed; the rest of the job still completed.
    pub render_error: Option<RenderError>,
    pub progress: PipelineProgress,
}

impl JobResult {
    pub fn is_done(&self) -> bool {
        self.state == PipelineState::Done
    }
}

/// State and counters shared by the page workers.
struct Tracker {
    state: Arc<Mutex<PipelineState>>,
    progress: Option<ProgressSender>,
    processed: AtomicUsize,
    total: AtomicUsize,
}

impl Tracker {
    fn new(state: Arc<Mutex<PipelineState>>, progress: Option<ProgressSender>) -> Self {
        Self {
            state,
            progress,
            processed: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        }
    }

    fn current(&self) -> PipelineState {
        *lock(&self.state)
    }

    fn transition(&self, next: PipelineState) {
        let previous = std::mem::replace(&mut *lock(&self.state), next);
        match next {
            PipelineState::ExtractingPage(_) => log::debug!("[Pipeline] {} -> {}", previous, next),
            _ => log::info!("[Pipeline] {} -> {}", previous, next),
        }
        self.emit(next);
    }

    fn page_done(&self) {
        let processed = self.processed.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!(
            "[Pipeline] {}/{} page(s) processed",
            processed,
            self.total.load(Ordering::SeqCst)
        );
        self.emit(self.current());
    }

    fn snapshot(&self, state: PipelineState) -> PipelineProgress {
        PipelineProgress {
            status: state.to_string(),
            processed_pages: self.processed.load(Ordering::SeqCst),
            total_pages: self.total.load(Ordering::SeqCst),
            cancelled: state == PipelineState::Cancelled,
        }
    }

    fn emit(&self, state: PipelineState) {
        if let Some(tx) = &self.progress {
            // receiver gone means nobody is listening any more
            let _ = tx.send(self.snapshot(state));
        }
    }
}

/// Pattern fields for every page, minus those the extraction already covers.
fn supplementary_fields(pages: &[PageExtraction], backend: &[ExtractedField]) -> Vec<ExtractedField> {
    let detected: Vec<ExtractedField> = pages
        .iter()
        .flat_map(|p| detect_patterns(&p.text, p.page_index))
        .collect();
    merge_pattern_fields(backend, detected)
}

fn backend_fields(pages: &[PageExtraction]) -> Vec<ExtractedField> {
    pages.iter().flat_map(|p| p.fields.iter().cloned()).collect()
}

fn ordered(mut fields: Vec<ExtractedField>) -> Vec<ExtractedField> {
    fields.sort_by_key(|f| f.page_index);
    fields
}

pub struct Pipeline {
    chain: ExtractionChain,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(chain: ExtractionChain, config: PipelineConfig) -> Self {
        Self { chain, config }
    }

    pub fn from_config(config: PipelineConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.build_chain()?, config))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `job` to a terminal state. Progress snapshots go to `progress` when given.
    pub async fn run(
        &self,
        job: PipelineJob,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> JobResult {
        let state = Arc::new(Mutex::new(PipelineState::Idle));
        self.run_tracked(job, state, progress, cancel).await
    }

    /// Spawn `job` on the runtime and hand back its handle.
    pub fn start(self: &Arc<Self>, job: PipelineJob) -> JobHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let state = Arc::new(Mutex::new(PipelineState::Idle));

        let pipeline = Arc::clone(self);
        let task = tokio::spawn({
            let cancel = cancel.clone();
            let state = Arc::clone(&state);
            async move { pipeline.run_tracked(job, state, Some(tx), cancel).await }
        });

        JobHandle {
            progress: rx,
            cancel,
            state,
            task,
        }
    }

    async fn extract_pages(
        &self,
        pages: Vec<PageDocument>,
        mode: ExtractionMode,
        tracker: &Tracker,
        results: &Mutex<Vec<Result<PageExtraction, ExtractionFailure>>>,
        cancel: &CancellationToken,
    ) {
        let workers = self.config.concurrency.max(1);

        stream::iter(pages)
            .map(|page| async move {
                if cancel.is_cancelled() {
                    log::debug!("[Pipeline] page {} not started, job cancelled", page.index);
                    return;
                }
                tracker.transition(PipelineState::ExtractingPage(page.index));

                let outcome = self.chain.extract(&page, mode).await;
                if let (Ok(extraction), true) = (&outcome, self.config.log_full_text) {
                    log::debug!("[Pipeline] page {} text:\n{}", page.index, extraction.text);
                }
                lock(results).push(outcome);
                tracker.page_done();
            })
            .buffer_unordered(workers)
            .collect::<Vec<()>>()
            .await;
    }

    async fn run_tracked(
        &self,
        job: PipelineJob,
        state: Arc<Mutex<PipelineState>>,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> JobResult {
        let tracker = Tracker::new(state, progress);
        let mode = job.mode.unwrap_or(self.config.extraction_mode);

        tracker.transition(PipelineState::Splitting);
        let split = split_pages(&job.document);
        let total = split.pages.len();
        tracker.total.store(total, Ordering::SeqCst);

        let mut result = JobResult {
            state: PipelineState::Splitting,
            pages: Vec::new(),
            fields: Vec::new(),
            matches: Vec::new(),
            selection: job.selection.clone(),
            artifact: None,
            verification: None,
            split_warning: split.warning,
            page_failures: Vec::new(),
            error: None,
            render_error: None,
            progress: tracker.snapshot(PipelineState::Splitting),
        };

        let results = Mutex::new(Vec::with_capacity(total));
        let extraction = self.extract_pages(split.pages, mode, &tracker, &results, &cancel);
        let timed_out = match self.config.job_timeout() {
            Some(limit) => tokio::time::timeout(limit, extraction).await.is_err(),
            None => {
                extraction.await;
                false
            }
        };

        for outcome in std::mem::take(&mut *lock(&results)) {
            match outcome {
                Ok(page) => result.pages.push(page),
                Err(failure) => result.page_failures.push(failure),
            }
        }
        result.pages.sort_by_key(|p| p.page_index);
        result.page_failures.sort_by_key(|f| f.page_index);
        let attempted = result.pages.len() + result.page_failures.len();

        let early_exit = if timed_out {
            let limit = self.config.job_timeout().unwrap_or_default();
            log::error!("[Pipeline] timed out after {}s, {}/{} page(s) done", limit.as_secs(), attempted, total);
            Some((PipelineState::Failed, PipelineError::TimedOut(limit)))
        } else if cancel.is_cancelled() && attempted < total {
            log::warn!("[Pipeline] cancelled after {}/{} page(s)", attempted, total);
            Some((PipelineState::Cancelled, PipelineError::Cancelled))
        } else {
            result
                .page_failures
                .first()
                .cloned()
                .map(|failure| (PipelineState::Failed, PipelineError::from(failure)))
        };

        if let Some((terminal, error)) = early_exit {
            let backend = backend_fields(&result.pages);
            let supplements = supplementary_fields(&result.pages, &backend);
            result.fields = ordered(backend.into_iter().chain(supplements).collect());
            result.error = Some(error);
            return self.finish(result, &tracker, terminal);
        }

        tracker.transition(PipelineState::Matching);
        let backend = backend_fields(&result.pages);
        let mut session = MatchSession::new(job.elements.clone());
        session.extend(backend.iter().cloned());

        tracker.transition(PipelineState::PatternDetecting);
        let supplements = supplementary_fields(&result.pages, &backend);
        log::info!("[Pipeline] {} supplementary pattern field(s)", supplements.len());

        tracker.transition(PipelineState::Aggregating);
        session.extend(supplements.iter().cloned());
        result.matches = session.finish();
        result.fields = ordered(backend.into_iter().chain(supplements).collect());
        if job.auto_select {
            result.selection = auto_select(&result.matches, &job.selection);
        }

        if job.render {
            tracker.transition(PipelineState::Rendering);
            match render_redactions(
                &job.document,
                &result.selection,
                &result.fields,
                &self.config.redaction.render_options(),
            ) {
                Ok(artifact) => {
                    result.verification = self
                        .config
                        .verify
                        .as_ref()
                        .map(|options| verify_artifact(&artifact, &result.fields, options));
                    result.artifact = Some(artifact);
                }
                Err(e) => {
                    log::warn!("[Pipeline] rendering failed ({}): {}", e.code(), e);
                    result.render_error = Some(e);
                }
            }
        }

        self.finish(result, &tracker, PipelineState::Done)
    }

    fn finish(&self, mut result: JobResult, tracker: &Tracker, terminal: PipelineState) -> JobResult {
        tracker.transition(terminal);
        result.state = terminal;
        result.progress = tracker.snapshot(terminal);
        log::info!(
            "[Pipeline] {}: {} page(s), {} field(s), {} match result(s)",
            terminal,
            result.pages.len(),
            result.fields.len(),
            result.matches.len()
        );
        result
    }
}

/// A running job: progress stream, cancellation, and the eventual result.
pub struct JobHandle {
    progress: mpsc::UnboundedReceiver<PipelineProgress>,
    cancel: CancellationToken,
    state: Arc<Mutex<PipelineState>>,
    task: JoinHandle<JobResult>,
}

impl JobHandle {
    /// Stop scheduling new pages. Pages already being extracted finish.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> PipelineState {
        *lock(&self.state)
    }

    /// Next progress snapshot; `None` once the job has finished and all were read.
    pub async fn next_progress(&mut self) -> Option<PipelineProgress> {
        self.progress.recv().await
    }

    pub async fn wait(self) -> Result<JobResult, PipelineError> {
        self.task
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docveil_extract::{ExtractionMethod, ExtractionStrategy, ServiceError, StrategyError};
    use docveil_pdf::fixtures::PdfFixture;
    use docveil_types::{BoundingBox, ElementAction, FailureReason, FieldSource, MimeType};
    use std::collections::HashSet;
    use std::time::Duration;

    /// Backend stand-in: one `Surname` field per page, plus an email in the text.
    #[derive(Default)]
    struct MockBackend {
        failing: HashSet<usize>,
        /// Cancel this token once the n-th call has started.
        cancel_on_call: Option<(usize, CancellationToken)>,
        /// Per-page delay, for ordering and timeout tests.
        delays: Vec<(usize, Duration)>,
        calls: AtomicUsize,
        seen: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ExtractionStrategy for MockBackend {
        fn method(&self) -> ExtractionMethod {
            ExtractionMethod::RemoteOcr
        }

        fn supports(&self, _mode: ExtractionMode) -> bool {
            true
        }

        async fn extract(
            &self,
            page: &PageDocument,
            _mode: ExtractionMode,
        ) -> docveil_extract::Result<PageExtraction> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.seen.lock().unwrap().push(page.index);
            if let Some((n, token)) = &self.cancel_on_call {
                if call == *n {
                    token.cancel();
                }
            }
            if let Some((_, delay)) = self.delays.iter().find(|(i, _)| *i == page.index) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing.contains(&page.index) {
                return Err(StrategyError::Service(ServiceError::unknown(
                    "document is encrypted",
                )));
            }

            let i = page.index;
            Ok(PageExtraction {
                page_index: i,
                text: format!("Surname: Roe{i}\nContact jane{i}@example.com"),
                fields: vec![ExtractedField::new(
                    format!("mock-{i}"),
                    "Surname",
                    format!("Roe{i}"),
                    i,
                    FieldSource::Ocr,
                )
                .with_box(BoundingBox::new(0.1, 0.1, 0.3, 0.05))],
                method: ExtractionMethod::RemoteOcr,
            })
        }
    }

    fn document(pages: usize) -> SourceDocument {
        let mut fixture = PdfFixture::new();
        for i in 0..pages {
            let line = format!("Page {i}");
            fixture = fixture.page(&[line.as_str()]);
        }
        SourceDocument::new(fixture.build().unwrap(), MimeType::Pdf)
    }

    fn elements() -> Vec<ConfiguredDataElement> {
        vec![
            ConfiguredDataElement::new("e-surname", "Surname").with_action(ElementAction::Redact),
            ConfiguredDataElement::new("e-email", "Email"),
            ConfiguredDataElement::new("e-dob", "Date of Birth").required(),
        ]
    }

    fn pipeline(backend: Arc<MockBackend>, config: PipelineConfig) -> Pipeline {
        let strategy: Arc<dyn ExtractionStrategy> = backend;
        Pipeline::new(ExtractionChain::new(vec![strategy]), config)
    }

    fn drain(mut rx: mpsc::UnboundedReceiver<PipelineProgress>) -> Vec<PipelineProgress> {
        let mut out = Vec::new();
        while let Ok(p) = rx.try_recv() {
            out.push(p);
        }
        out
    }

    #[tokio::test]
    async fn test_three_pages_end_to_end() {
        let backend = Arc::new(MockBackend::default());
        let pipeline = pipeline(backend.clone(), PipelineConfig::default());
        let (tx, rx) = mpsc::unbounded_channel();

        let job = PipelineJob::new(document(3), elements()).rendered();
        let result = pipeline.run(job, Some(tx), CancellationToken::new()).await;

        assert_eq!(result.state, PipelineState::Done);
        assert!(result.error.is_none());
        assert_eq!(result.pages.len(), 3);
        assert_eq!(*backend.seen.lock().unwrap(), vec![0, 1, 2]);

        // 3 backend fields + 3 email pattern fields
        assert_eq!(result.fields.len(), 6);
        let pages: Vec<usize> = result.fields.iter().map(|f| f.page_index).collect();
        assert_eq!(pages, vec![0, 0, 1, 1, 2, 2]);

        let surname = &result.matches[0];
        assert_eq!(surname.element.as_ref().unwrap().id, "e-surname");
        assert!(result.matches[1].element.is_none());
        let email = result
            .matches
            .iter()
            .find(|m| m.element.as_ref().map(|e| e.id.as_str()) == Some("e-email"))
            .unwrap();
        assert_eq!(email.field.as_ref().unwrap().source, FieldSource::Pattern);
        let missing: Vec<&str> = result
            .matches
            .iter()
            .filter(|m| m.missing)
            .map(|m| m.element.as_ref().unwrap().id.as_str())
            .collect();
        assert_eq!(missing, vec!["e-dob"]);

        assert_eq!(result.selection.field_ids, vec!["mock-0"]);
        let artifact = result.artifact.as_ref().unwrap();
        assert_eq!(artifact.mime, MimeType::Pdf);
        assert_eq!(artifact.drawn(), 1);
        assert!(result.verification.unwrap().ok);

        let progress = drain(rx);
        let processed: Vec<usize> = progress.iter().map(|p| p.processed_pages).collect();
        assert!(processed.windows(2).all(|w| w[0] <= w[1]));
        let last = progress.last().unwrap();
        assert_eq!(last.status, "done");
        assert_eq!((last.processed_pages, last.total_pages), (3, 3));
        assert!(progress.iter().any(|p| p.status == "rendering"));
    }

    #[tokio::test]
    async fn test_failing_page_does_not_stop_others() {
        let backend = Arc::new(MockBackend {
            failing: HashSet::from([0]),
            ..MockBackend::default()
        });
        let pipeline = pipeline(backend.clone(), PipelineConfig::default());

        let job = PipelineJob::new(document(3), elements());
        let result = pipeline.run(job, None, CancellationToken::new()).await;

        assert_eq!(result.state, PipelineState::Failed);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        match result.error.as_ref().unwrap() {
            PipelineError::ExtractionFailed {
                page_index, reason, ..
            } => {
                assert_eq!(*page_index, 0);
                assert_eq!(*reason, FailureReason::Encrypted);
            }
            other => panic!("unexpected error {other:?}"),
        }
        let ids: Vec<&str> = result
            .fields
            .iter()
            .filter(|f| f.source == FieldSource::Ocr)
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(ids, vec!["mock-1", "mock-2"]);
        assert!(result.matches.is_empty());
        assert_eq!(result.page_failures.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_after_two_pages() {
        let token = CancellationToken::new();
        let backend = Arc::new(MockBackend {
            cancel_on_call: Some((2, token.clone())),
            ..MockBackend::default()
        });
        let pipeline = pipeline(backend.clone(), PipelineConfig::default());
        let (tx, rx) = mpsc::unbounded_channel();

        let job = PipelineJob::new(document(5), elements()).rendered();
        let result = pipeline.run(job, Some(tx), token).await;

        assert_eq!(result.state, PipelineState::Cancelled);
        assert_eq!(result.pages.len(), 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        assert!(result.artifact.is_none());
        assert_eq!(result.error.as_ref().unwrap().code(), "pipeline_cancelled");

        let last = drain(rx).pop().unwrap();
        assert!(last.cancelled);
        assert_eq!((last.processed_pages, last.total_pages), (2, 5));
    }

    #[tokio::test]
    async fn test_worker_pool_matches_sequential() {
        let delays = vec![
            (0, Duration::from_millis(60)),
            (1, Duration::from_millis(30)),
            (2, Duration::from_millis(0)),
        ];
        let sequential = pipeline(Arc::new(MockBackend::default()), PipelineConfig::default())
            .run(
                PipelineJob::new(document(3), elements()),
                None,
                CancellationToken::new(),
            )
            .await;

        let backend = Arc::new(MockBackend {
            delays,
            ..MockBackend::default()
        });
        let config = PipelineConfig {
            concurrency: 3,
            ..PipelineConfig::default()
        };
        let pooled = pipeline(backend.clone(), config)
            .run(
                PipelineJob::new(document(3), elements()),
                None,
                CancellationToken::new(),
            )
            .await;

        assert_eq!(pooled.state, PipelineState::Done);
        let order: Vec<usize> = pooled.pages.iter().map(|p| p.page_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(pooled.matches, sequential.matches);
        assert_eq!(pooled.fields, sequential.fields);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_timeout_keeps_partial_results() {
        let backend = Arc::new(MockBackend {
            delays: vec![(1, Duration::from_secs(600))],
            ..MockBackend::default()
        });
        let config = PipelineConfig {
            job_timeout_secs: Some(5),
            ..PipelineConfig::default()
        };
        let result = pipeline(backend, config)
            .run(
                PipelineJob::new(document(3), elements()),
                None,
                CancellationToken::new(),
            )
            .await;

        assert_eq!(result.state, PipelineState::Failed);
        assert!(matches!(result.error, Some(PipelineError::TimedOut(_))));
        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.fields[0].id, "mock-0");
    }

    #[tokio::test]
    async fn test_handle_reports_progress() {
        let pipeline = Arc::new(pipeline(
            Arc::new(MockBackend::default()),
            PipelineConfig::default(),
        ));
        let mut handle = pipeline.start(PipelineJob::new(document(2), elements()));

        let mut statuses = Vec::new();
        while let Some(progress) = handle.next_progress().await {
            statuses.push(progress.status);
        }
        assert_eq!(statuses.first().map(String::as_str), Some("splitting"));
        assert_eq!(statuses.last().map(String::as_str), Some("done"));
        assert_eq!(handle.state(), PipelineState::Done);

        let result = handle.wait().await.unwrap();
        assert!(result.is_done());
        assert!(result.progress.is_complete());
    }

    #[tokio::test]
    async fn test_unsplittable_document_runs_as_one_page() {
        let pipeline = pipeline(Arc::new(MockBackend::default()), PipelineConfig::default());
        let source = SourceDocument::new(b"%PDF-broken".to_vec(), MimeType::Pdf);

        let result = pipeline
            .run(PipelineJob::new(source, elements()), None, CancellationToken::new())
            .await;
        assert_eq!(result.split_warning.unwrap().code(), "split_failed");
        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.state, PipelineState::Done);
    }

    #[tokio::test]
    async fn test_undecodable_pdf_render_is_unsupported_artifact() {
        let pipeline = pipeline(Arc::new(MockBackend::default()), PipelineConfig::default());
        let source = SourceDocument::new(b"%PDF-broken".to_vec(), MimeType::Pdf);

        let job = PipelineJob::new(source, elements()).rendered();
        let result = pipeline.run(job, None, CancellationToken::new()).await;

        assert_eq!(result.state, PipelineState::Done);
        assert_eq!(result.selection.field_ids, vec!["mock-0"]);
        assert!(result.artifact.is_none());
        let err = result.render_error.unwrap();
        assert_eq!(err.code(), "redaction_unsupported_artifact");
    }

    #[tokio::test]
    async fn test_pipeline_from_config_runs_local_tiers() {
        let built: Result<Pipeline, ConfigError> = Pipeline::from_config(PipelineConfig::default());
        let pipeline = built.unwrap();
        let result = pipeline
            .run(
                PipelineJob::new(document(2), elements()),
                None,
                CancellationToken::new(),
            )
            .await;

        assert_eq!(result.state, PipelineState::Done);
        assert_eq!(result.pages.len(), 2);
        assert_eq!(result.pages[0].method, ExtractionMethod::DirectParse);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_config_bounds_a_hung_page() {
        let backend = Arc::new(MockBackend {
            delays: vec![(0, Duration::from_secs(24 * 3600))],
            ..MockBackend::default()
        });
        let result = pipeline(backend, PipelineConfig::default())
            .run(
                PipelineJob::new(document(1), elements()),
                None,
                CancellationToken::new(),
            )
            .await;

        assert_eq!(result.state, PipelineState::Failed);
        assert!(matches!(
            result.error,
            Some(PipelineError::TimedOut(limit)) if limit == Duration::from_secs(600)
        ));
    }
}
