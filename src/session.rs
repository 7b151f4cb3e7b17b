//! Chat session entry points.
//!
//! A chat front end drives the pipeline through two calls:
//!
//! 1. [`initialize_session`] once per new conversation: load the corpus,
//!    rebuild the index, and hand back a [`SessionHandle`]. Any error here
//!    means the session must not accept messages.
//! 2. [`handle_message`] once per inbound message: retrieve, gate, and
//!    compose exactly one [`Answer`]. Errors here fail only that turn.
//!
//! ```text
//! initialize_session:  corpus ─▶ chunk ─▶ embed ─▶ store (full rebuild)
//! handle_message:      embed query ─▶ search ─▶ gate ─┬─▶ compose ─▶ Answer::Generated
//!                                                     └─▶ Answer::NoMatch
//! ```

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::compose::{compose_answer, PROMPT_TEMPLATE};
use crate::config::{self, Config};
use crate::corpus::load_corpus;
use crate::embedding::{create_embedder, Embedder};
use crate::error::RagError;
use crate::gate;
use crate::index::build_index;
use crate::llm::{create_model, LanguageModel};
use crate::models::{Answer, IndexLocation, IndexStats, NewsItem};
use crate::retrieve::retrieve;
use crate::store::{SqliteVectorStore, VectorStore};

/// The external services a session talks to.
#[derive(Clone)]
pub struct Pipeline {
    pub embedder: Arc<dyn Embedder>,
    pub model: Arc<dyn LanguageModel>,
    pub store: Arc<dyn VectorStore>,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            embedder,
            model,
            store,
        }
    }

    /// Build the configured providers over the SQLite store.
    pub fn from_config(config: &Config) -> Result<Self, RagError> {
        let embedder = create_embedder(&config.embedding).map_err(RagError::Config)?;
        let model = create_model(&config.llm).map_err(RagError::Config)?;
        Ok(Self {
            embedder: Arc::from(embedder),
            model: Arc::from(model),
            store: Arc::new(SqliteVectorStore::new()),
        })
    }
}

/// A started session: its configuration, services, and freshly built index.
pub struct SessionHandle {
    id: Uuid,
    started_at: DateTime<Utc>,
    config: Config,
    location: IndexLocation,
    pipeline: Pipeline,
    stats: IndexStats,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    pub fn location(&self) -> &IndexLocation {
        &self.location
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn template(&self) -> &str {
        self.config
            .prompt
            .template
            .as_deref()
            .unwrap_or(PROMPT_TEMPLATE)
    }
}

/// Start a session from the corpus file named in `config`.
pub async fn initialize_session(
    config: &Config,
    pipeline: Pipeline,
) -> Result<SessionHandle, RagError> {
    config::validate(config).map_err(RagError::Config)?;
    let items = load_corpus(&config.corpus.path).map_err(RagError::CorpusLoad)?;
    initialize_session_with_corpus(config, pipeline, &items).await
}

/// Start a session from already-loaded corpus items.
pub async fn initialize_session_with_corpus(
    config: &Config,
    pipeline: Pipeline,
    items: &[NewsItem],
) -> Result<SessionHandle, RagError> {
    config::validate(config).map_err(RagError::Config)?;

    let id = Uuid::new_v4();
    let location = config.index.location();
    tracing::info!(session = %id, %location, "starting session");

    let stats = build_index(
        items,
        config,
        &location,
        pipeline.embedder.as_ref(),
        pipeline.store.as_ref(),
    )
    .await
    .map_err(RagError::IndexBuild)?;

    tracing::info!(
        session = %id,
        documents = stats.documents,
        chunks = stats.chunks_indexed,
        "session ready"
    );

    Ok(SessionHandle {
        id,
        started_at: Utc::now(),
        config: config.clone(),
        location,
        pipeline,
        stats,
    })
}

/// Answer one user message.
///
/// Blank messages and weak or empty retrievals yield [`Answer::NoMatch`]
/// without calling the language model.
pub async fn handle_message(session: &SessionHandle, text: &str) -> Result<Answer, RagError> {
    if text.trim().is_empty() {
        return Ok(Answer::NoMatch);
    }

    let retrieval = &session.config.retrieval;
    let results = retrieve(
        text,
        retrieval.top_k,
        &session.location,
        session.pipeline.embedder.as_ref(),
        session.pipeline.store.as_ref(),
    )
    .await
    .map_err(RagError::Retrieval)?;

    let decision = gate::evaluate(&results, retrieval.min_score);
    if !decision.should_answer() {
        tracing::info!(session = %session.id, ?decision, "no match");
        return Ok(Answer::NoMatch);
    }

    let output = compose_answer(
        session.pipeline.model.as_ref(),
        session.template(),
        &results,
        text,
    )
    .await
    .map_err(RagError::Generation)?;

    tracing::info!(session = %session.id, chars = output.len(), "answer generated");
    Ok(Answer::Generated(output))
}

/// The text a chat front end sends back for one turn.
pub fn render_reply(outcome: &Result<Answer, RagError>) -> String {
    match outcome {
        Ok(answer) => format!("Answer: {}", answer),
        Err(e) => format!("Error: {}", e),
    }
}
