use crate::config::QaConfig;
use crate::context::ContextAssembler;
use crate::error::{GenerationError, Result};
use crate::generator::{Generator, OpenAiGenerator};
use crate::prompt::NOT_FOUND_ANSWER;
use serde::Serialize;
use std::sync::Arc;
use webqa_chunker::{Chunker, ChunkingStats};
use webqa_search::{RetrievalResult, Retriever, SearchError};
use webqa_source::{DocumentSource, TextCleaner, WebsiteLoader};
use webqa_vector_store::{Embedder, EmbeddingModel, IndexPhase, VectorIndex};

/// What to index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSource {
    /// Fetched, then cleaned
    Url(String),
    /// Already-clean text, indexed as given
    Text {
        text: String,
        source: String,
        title: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub source: String,
    pub title: String,
    pub chunk_count: usize,
    pub total_chars: usize,
    pub avg_chunk_chars: usize,
}

/// An answer together with the chunks it was grounded on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<RetrievalResult>,
}

impl Answer {
    /// True when retrieval found nothing and the fixed fallback was returned.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Index a page once, then answer questions about it from its text alone.
pub struct QaPipeline {
    chunker: Chunker,
    cleaner: TextCleaner,
    source: Arc<dyn DocumentSource>,
    index: Arc<VectorIndex>,
    retriever: Retriever,
    assembler: ContextAssembler,
    generator: Option<Arc<dyn Generator>>,
    load_gate: tokio::sync::Mutex<()>,
}

impl QaPipeline {
    /// Production wiring: configured embedder, HTTP loader, OpenAI generator.
    ///
    /// Without an API key the pipeline can still index, search and return the
    /// fallback answer; generating a real answer then fails with a configuration error.
    pub fn from_config(config: &QaConfig) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingModel::from_config(&config.embedding)?);
        let source: Arc<dyn DocumentSource> = Arc::new(WebsiteLoader::new(config.source.clone())?);
        let generator: Option<Arc<dyn Generator>> = match OpenAiGenerator::new(&config.generation) {
            Ok(generator) => Some(Arc::new(generator)),
            Err(GenerationError::Configuration(reason)) => {
                log::debug!("Answer generation disabled: {reason}");
                None
            }
            Err(err) => return Err(err.into()),
        };
        Self::with_components(config, embedder, source, generator)
    }

    /// Wiring with caller-supplied embedder, page source and generator.
    pub fn with_components(
        config: &QaConfig,
        embedder: Arc<dyn Embedder>,
        source: Arc<dyn DocumentSource>,
        generator: Option<Arc<dyn Generator>>,
    ) -> Result<Self> {
        config.validate()?;
        let chunker = Chunker::new(config.chunking.clone())?;
        let cleaner = TextCleaner::new(config.cleaner.clone())?;
        let index = Arc::new(VectorIndex::new(embedder, config.index_paths()));
        let retriever = Retriever::new(Arc::clone(&index), config.retrieval)?;
        Ok(Self {
            chunker,
            cleaner,
            source,
            index,
            retriever,
            assembler: ContextAssembler,
            generator,
            load_gate: tokio::sync::Mutex::new(()),
        })
    }

    #[must_use]
    pub fn index_handle(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Fetch (or take) the text, chunk it and replace the persisted index.
    pub async fn index(&self, input: IndexSource) -> Result<IndexReport> {
        let (text, source, title) = match input {
            IndexSource::Url(url) => {
                let document = self.source.fetch(&url).await?;
                let cleaned = self.cleaner.clean(&document.raw_text)?;
                (cleaned, document.url, document.title)
            }
            IndexSource::Text {
                text,
                source,
                title,
            } => (text, source, title),
        };

        let chunks = self.chunker.create_chunks(&text, &source, &title)?;
        let stats = ChunkingStats::from_chunks(&chunks);
        let chunk_count = self.index.rebuild(chunks).await?;
        log::info!("Indexed '{title}' from {source}: {stats}");

        Ok(IndexReport {
            source,
            title,
            chunk_count,
            total_chars: stats.total_chars,
            avg_chunk_chars: stats.avg_chars(),
        })
    }

    /// Answer from the persisted index, loading it on first use.
    pub async fn ask(&self, question: &str) -> Result<String> {
        Ok(self.ask_with_sources(question).await?.answer)
    }

    pub async fn ask_with_sources(&self, question: &str) -> Result<Answer> {
        self.ensure_loaded().await?;
        self.answer_with_sources(question).await
    }

    /// Answer from the index currently in memory.
    pub async fn answer(&self, question: &str) -> Result<String> {
        Ok(self.answer_with_sources(question).await?.answer)
    }

    pub async fn answer_with_sources(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SearchError::EmptyQuery.into());
        }

        let results = self.retriever.retrieve(question).await?;
        if results.is_empty() {
            log::info!("No chunk within the relevance threshold; returning the fallback answer");
            return Ok(Answer {
                answer: NOT_FOUND_ANSWER.to_string(),
                sources: results,
            });
        }

        let generator = self.generator.as_ref().ok_or_else(|| {
            GenerationError::Configuration(
                "OPENAI_API_KEY not found in environment variables".to_string(),
            )
        })?;
        let context = self.assembler.assemble(&results);
        log::debug!(
            "Generating from {} chunks ({} context chars)",
            results.len(),
            context.len()
        );

        let reply = generator.generate(&context, question).await?;
        let answer = reply.trim().to_string();
        if answer.is_empty() {
            return Err(GenerationError::BadResponse("model returned an empty answer".into()).into());
        }
        Ok(Answer {
            answer,
            sources: results,
        })
    }

    /// Retrieval only, without generation. `top_k` overrides the configured value.
    pub async fn search(&self, query: &str, top_k: Option<usize>) -> Result<Vec<RetrievalResult>> {
        self.ensure_loaded().await?;
        let top_k = top_k.unwrap_or(self.retriever.config().top_k);
        Ok(self.retriever.retrieve_top(query, top_k).await?)
    }

    async fn ensure_loaded(&self) -> Result<()> {
        let _gate = self.load_gate.lock().await;
        if self.index.phase() == IndexPhase::Empty {
            self.index.load().await?;
        }
        Ok(())
    }
}
