//! Request-level pipeline coordination.
//!
//! [`PrepService`] owns long-lived handles to the store client, the embedding
//! and generation providers, and the metrics registry, so every HTTP request
//! reuses the same components. Construct the service once near process start
//! and share it through an `Arc`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::chunking;
use crate::config::Config;
use crate::embedding::{EmbeddingClient, OllamaEmbeddingClient};
use crate::extract::{self, ExtractError};
use crate::generation::{
    ChatMessage, DecodingOptions, DeltaStream, GenerationClient, GenerationError,
};
use crate::metrics::{IngestMetrics, MetricsSnapshot};
use crate::prompt::{self, ExamKind, directives::PlanDirectives};
use crate::retrieval::{CHAT_TUNING, EXAM_TUNING, PREP_TUNING, RetrievalTuning, Retriever};
use crate::store::{NewChunk, NewDocument, StoreClient, StoreError};

const CHAT_OPTIONS: DecodingOptions = DecodingOptions {
    temperature: 0.3,
    num_predict: 2000,
    top_p: None,
    repeat_penalty: Some(1.15),
};

const PREP_OPTIONS: DecodingOptions = DecodingOptions {
    temperature: 0.3,
    num_predict: 1000,
    top_p: Some(0.9),
    repeat_penalty: None,
};

const EXAM_STREAM_OPTIONS: DecodingOptions = DecodingOptions {
    temperature: 0.3,
    num_predict: 1200,
    top_p: None,
    repeat_penalty: None,
};

const PLAN_OPTIONS: DecodingOptions = DecodingOptions {
    temperature: 0.15,
    num_predict: 3000,
    top_p: None,
    repeat_penalty: None,
};

/// Errors surfaced by the pipeline to the request boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Document extraction rejected the upload.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// Persistence store interaction failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Generation provider failed or produced malformed output.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// No subject scope could be resolved for the request.
    #[error("Could not resolve a subject; upload a document first")]
    NoSubject,
    /// The resolved subject has no retrievable content.
    #[error("No syllabus content available")]
    NoContent,
}

/// Uploaded document payload handed to the ingestion orchestrator.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    /// Subject scope the document belongs to.
    pub subject_id: String,
    /// Original filename, used for format dispatch and stored for reference.
    pub filename: String,
    /// Declared MIME type, if the uploader provided one.
    pub content_type: Option<String>,
    /// Raw document bytes.
    pub bytes: Vec<u8>,
}

/// Per-chunk outcome counts for one ingestion run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IngestionReport {
    /// Chunks produced by the chunker.
    pub chunks_total: usize,
    /// Chunks embedded and persisted.
    pub chunks_succeeded: usize,
}

/// Result of a unit-prep request, flagging cache hits.
#[derive(Debug, Clone, Serialize)]
pub struct UnitPrepOutcome {
    /// Generated (or cached) unit summary.
    pub prep: String,
    /// Whether the answer came from the `(subject, unit)` cache.
    pub cached: bool,
}

/// One question/answer pair of the study-plan hitlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitlistItem {
    /// Exam-style question, including its mark weight.
    pub q: String,
    /// Model answer.
    pub a: String,
}

/// Rapid-review summary for one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSummary {
    /// Unit name.
    pub unit: String,
    /// Review paragraph.
    pub text: String,
}

/// A single flashcard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    /// Term shown on the front.
    pub front: String,
    /// Definition shown on the back.
    pub back: String,
}

/// Structured study plan returned by the plan generator.
///
/// Cardinality (4 hitlist items, 2 summaries, 5 flashcards) is enforced by
/// instruction to the provider, not validated locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyPlan {
    /// High-yield question hitlist.
    pub hitlist: Vec<HitlistItem>,
    /// Unit summaries.
    pub summaries: Vec<UnitSummary>,
    /// Flashcards.
    pub flashcards: Vec<Flashcard>,
}

/// Coordinates ingestion and every query flow.
pub struct PrepService {
    store: Arc<StoreClient>,
    embedder: Arc<dyn EmbeddingClient>,
    generation: GenerationClient,
    retriever: Retriever,
    metrics: Arc<IngestMetrics>,
}

impl PrepService {
    /// Build the service from loaded configuration, constructing and wiring
    /// all provider clients.
    pub fn new(config: Config) -> Result<Self, StoreError> {
        let store = Arc::new(StoreClient::new(config.store)?);
        let embedder: Arc<dyn EmbeddingClient> =
            Arc::new(OllamaEmbeddingClient::new(config.embedding));
        let generation = GenerationClient::new(config.generation);
        let retriever = Retriever::new(store.clone(), embedder.clone(), config.retrieval);

        Ok(Self {
            store,
            embedder,
            generation,
            retriever,
            metrics: Arc::new(IngestMetrics::new()),
        })
    }

    /// Ingest one uploaded document: extract, persist the document row,
    /// chunk, then embed and persist chunk by chunk.
    ///
    /// A chunk whose embedding fails (or whose vector has the wrong
    /// dimensionality) is counted as failed and skipped; it is never
    /// persisted without an embedding. One bad chunk does not abort the
    /// document.
    pub async fn ingest_document(
        &self,
        upload: DocumentUpload,
    ) -> Result<IngestionReport, ServiceError> {
        let text = extract::extract(
            &upload.bytes,
            upload.content_type.as_deref(),
            &upload.filename,
        )?;

        let document = NewDocument {
            id: Uuid::new_v4().to_string(),
            subject_id: upload.subject_id,
            filename: upload.filename,
            full_text: text.clone(),
        };
        self.store.insert_document(&document).await?;

        let chunks = chunking::chunk_document(&text);
        let chunks_total = chunks.len();
        let mut chunks_succeeded = 0usize;

        for (index, content) in chunks.into_iter().enumerate() {
            let vector = match self.embedder.embed(&content).await {
                Ok(vector) => vector,
                Err(error) => {
                    tracing::warn!(
                        document = %document.id,
                        chunk = index,
                        error = %error,
                        "Skipping chunk: embedding failed"
                    );
                    continue;
                }
            };

            let expected = self.embedder.dimension();
            if vector.len() != expected {
                tracing::warn!(
                    document = %document.id,
                    chunk = index,
                    expected,
                    actual = vector.len(),
                    "Skipping chunk: embedding dimension mismatch"
                );
                continue;
            }

            let chunk = NewChunk {
                subject_id: document.subject_id.clone(),
                document_id: document.id.clone(),
                content,
                embedding: vector,
            };
            match self.store.insert_chunk(&chunk).await {
                Ok(()) => chunks_succeeded += 1,
                Err(error) => {
                    tracing::warn!(
                        document = %document.id,
                        chunk = index,
                        error = %error,
                        "Skipping chunk: store insert failed"
                    );
                }
            }
        }

        self.metrics.record_document(
            chunks_succeeded as u64,
            (chunks_total - chunks_succeeded) as u64,
        );
        tracing::info!(
            document = %document.id,
            subject = %document.subject_id,
            chunks_total,
            chunks_succeeded,
            "Document ingested"
        );

        Ok(IngestionReport {
            chunks_total,
            chunks_succeeded,
        })
    }

    /// Stream a conversational answer grounded in the subject's material.
    pub async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        subject_id: Option<&str>,
    ) -> Result<DeltaStream, ServiceError> {
        let query = messages
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();

        let context = self.context_for(&query, subject_id, CHAT_TUNING).await?;
        let system = prompt::chat_system(&context);

        let mut conversation = Vec::with_capacity(messages.len() + 1);
        conversation.push(ChatMessage {
            role: "system".into(),
            content: system,
        });
        conversation.extend(messages);

        Ok(self
            .generation
            .stream_chat(&conversation, CHAT_OPTIONS)
            .await?)
    }

    /// Produce (or replay) the comprehensive study summary for one unit.
    ///
    /// Answers are cached under `(subject, unit)` after full completion and
    /// never invalidated automatically; cache reads and writes are
    /// best-effort so a cache outage cannot block generation.
    pub async fn unit_prep(
        &self,
        unit: &str,
        subject_id: Option<&str>,
    ) -> Result<UnitPrepOutcome, ServiceError> {
        let subject = self
            .retriever
            .resolve_subject(subject_id)
            .await?
            .ok_or(ServiceError::NoSubject)?;

        match self.store.cached_prep(&subject.id, unit).await {
            Ok(Some(content)) => {
                tracing::debug!(subject = %subject.id, unit, "Serving cached unit prep");
                return Ok(UnitPrepOutcome {
                    prep: content,
                    cached: true,
                });
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(subject = %subject.id, unit, error = %error, "Prep cache read failed");
            }
        }

        let query = format!("comprehensive details and summary for {unit}");
        let chunks = self
            .retriever
            .retrieve(&query, &subject.id, PREP_TUNING)
            .await?;
        if chunks.is_empty() {
            return Err(ServiceError::NoContent);
        }

        let context = self.bounded_context(&chunks);
        let prompt = prompt::unit_prep(unit, &context);
        let answer = self.generation.generate(&prompt, PREP_OPTIONS, false).await?;

        if let Err(error) = self.store.save_prep(&subject.id, unit, &answer).await {
            tracing::warn!(subject = %subject.id, unit, error = %error, "Failed to cache unit prep");
        }

        Ok(UnitPrepOutcome {
            prep: answer,
            cached: false,
        })
    }

    /// Answer one exam-style question for a fixed mark weight.
    pub async fn answer_question(
        &self,
        question: &str,
        marks: u32,
        subject_id: Option<&str>,
    ) -> Result<String, ServiceError> {
        let subject = self
            .retriever
            .resolve_subject(subject_id)
            .await?
            .ok_or(ServiceError::NoSubject)?;

        let chunks = self
            .retriever
            .retrieve(question, &subject.id, PREP_TUNING)
            .await?;
        if chunks.is_empty() {
            return Err(ServiceError::NoContent);
        }

        let context = self.bounded_context(&chunks);
        let prompt = prompt::question_answer(question, marks, &context);
        Ok(self.generation.generate(&prompt, PREP_OPTIONS, false).await?)
    }

    /// Stream a generated exam paper in one of the fixed structures.
    pub async fn exam_prep_stream(
        &self,
        kind: ExamKind,
        subject_id: Option<&str>,
    ) -> Result<DeltaStream, ServiceError> {
        let subject = self
            .retriever
            .resolve_subject(subject_id)
            .await?
            .ok_or(ServiceError::NoSubject)?;

        let chunks = self
            .retriever
            .retrieve(kind.retrieval_query(), &subject.id, EXAM_TUNING)
            .await?;
        let context = self.bounded_context(&chunks);
        let prompt = prompt::exam_paper(kind, &context);

        Ok(self
            .generation
            .stream_generate(&prompt, EXAM_STREAM_OPTIONS)
            .await?)
    }

    /// Generate one unit of the parameterized study plan as structured JSON.
    pub async fn study_plan(
        &self,
        subject_id: &str,
        directives: &PlanDirectives,
    ) -> Result<StudyPlan, ServiceError> {
        let chunks = self.retriever.plan_context(subject_id).await?;
        let context = self.bounded_context(&chunks);
        let prompt = prompt::study_plan(directives, &context);

        let raw = self.generation.generate(&prompt, PLAN_OPTIONS, true).await?;
        let plan: StudyPlan = serde_json::from_str(&raw).map_err(|error| {
            GenerationError::MalformedOutput(format!(
                "study plan JSON did not match the schema: {error}"
            ))
        })?;

        tracing::debug!(
            subject = subject_id,
            unit = directives.target_unit,
            hitlist = plan.hitlist.len(),
            summaries = plan.summaries.len(),
            flashcards = plan.flashcards.len(),
            "Study plan generated"
        );
        Ok(plan)
    }

    /// Return the current ingestion metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn context_for(
        &self,
        query: &str,
        subject_id: Option<&str>,
        tuning: RetrievalTuning,
    ) -> Result<String, ServiceError> {
        let Some(subject) = self.retriever.resolve_subject(subject_id).await? else {
            return Ok(String::new());
        };
        let chunks = self.retriever.retrieve(query, &subject.id, tuning).await?;
        Ok(self.bounded_context(&chunks))
    }

    fn bounded_context(&self, chunks: &[String]) -> String {
        let joined = prompt::join_context(chunks);
        prompt::truncate_context(&joined, self.retriever.context_char_budget()).to_string()
    }
}
