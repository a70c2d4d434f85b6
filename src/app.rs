use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::adapters::{CrossEncoderClient, EmbeddingClient, MeilisearchClient, QdrantClient};
use crate::answer::{self, AnswerGenerator, ChatClient, QueryResponse};
use crate::config::Config;
use crate::core::QueryContext;
use crate::error::Result;
use crate::search::{RetrievalPolicy, Retriever};

/// Everything a command or request handler needs: resolved configuration,
/// the retrieval pipeline and the optional answer generator.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub policy: RetrievalPolicy,
    pub retriever: Arc<Retriever>,
    pub generator: Option<Arc<dyn AnswerGenerator>>,
    pub robot_mode: bool,
    pub verbosity: u8,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("retriever", &self.retriever)
            .field("generator", &self.generator.as_ref().map(|g| g.model().to_string()))
            .field("robot_mode", &self.robot_mode)
            .finish()
    }
}

impl AppContext {
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let config = Config::load(cli.config.as_deref(), &cwd)?;
        let policy = RetrievalPolicy::load(policy_path(cli.policy.as_deref(), &config).as_deref())?;

        let mut ctx = Self::from_parts(config, policy)?;
        ctx.robot_mode = cli.robot;
        ctx.verbosity = cli.verbose;
        Ok(ctx)
    }

    /// Build the HTTP collaborators described by `config`.
    pub fn from_parts(config: Config, policy: RetrievalPolicy) -> Result<Self> {
        let timeouts = &policy.timeouts;

        let lexical = MeilisearchClient::new(&config.lexical, timeouts.search)?;
        let vector = QdrantClient::new(&config.vector, timeouts.search)?;
        let embedding = &config.embedding;
        let text_embedder = EmbeddingClient::new(
            embedding.url.as_str(),
            embedding.model.as_str(),
            embedding.api_key.clone(),
            timeouts.search,
        )?;

        let mut retriever = Retriever::new(
            Arc::new(lexical),
            Arc::new(vector),
            Arc::new(text_embedder),
            policy.clone(),
        );

        if let Some(url) = embedding.image_url.as_deref() {
            let model = embedding.image_model.as_deref().unwrap_or(&embedding.model);
            let image_embedder =
                EmbeddingClient::new(url, model, embedding.api_key.clone(), timeouts.search)?;
            retriever = retriever.with_image_embedder(Arc::new(image_embedder));
        } else {
            debug!("no image embedding endpoint; image branch disabled");
        }

        if let Some(url) = config.rerank.url.as_deref() {
            let reranker = CrossEncoderClient::new(
                url,
                config.rerank.model.clone(),
                config.rerank.api_key.clone(),
                timeouts.rerank,
            )?;
            retriever = retriever.with_reranker(Arc::new(reranker));
        } else {
            debug!("no rerank endpoint; results keep boosted order");
        }

        let generator: Option<Arc<dyn AnswerGenerator>> = if config.answer.enabled {
            Some(Arc::new(ChatClient::new(&config.answer, timeouts.answer)?))
        } else {
            None
        };

        Ok(Self::new(config, policy, retriever, generator))
    }

    /// Assemble a context around an existing pipeline.
    pub fn new(
        config: Config,
        policy: RetrievalPolicy,
        retriever: Retriever,
        generator: Option<Arc<dyn AnswerGenerator>>,
    ) -> Self {
        Self {
            config,
            policy,
            retriever: Arc::new(retriever),
            generator,
            robot_mode: false,
            verbosity: 0,
        }
    }

    /// Retrieve for `query` and, when asked, generate an answer over the
    /// resulting citations.
    pub async fn run_query(&self, query: &QueryContext, with_answer: bool) -> QueryResponse {
        let result = self.retriever.retrieve(query).await;
        let response = QueryResponse::from_results(&result, &self.config.server.media_base_url);
        if !with_answer {
            return response;
        }

        let answer = answer::answer(
            self.generator.as_deref(),
            query.query(),
            &response.citations,
            self.config.answer.context_results,
            self.policy.timeouts.answer,
        )
        .await;
        response.with_answer(answer)
    }
}

/// Policy file precedence: command line, then configuration.
pub fn policy_path(explicit: Option<&Path>, config: &Config) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| config.policy_path.clone())
}
