//! Startup and shutdown of the whole pipeline.
//!
//! [`AppContext::init`] runs the build phase: read the three HR tables,
//! format and chunk them, embed and persist the chunks. Only then is the
//! assistant handed out, so no question is ever answered against a partial
//! index.

use crate::answerer::Answerer;
use crate::assistant::Assistant;
use crate::config::{AppConfig, GenerationConfig, SheetsConfig};
use crate::error::{AssistantError, Result};
use crate::generation::{GenerativeModel, OpenAiChatModel};
use crate::logger::InteractionLogger;
use crate::sheets::{GoogleSheets, InteractionLog, LocalWorkbook, SheetSource};
use hr_assistant_context::{
    Chunk, CorpusBuilder, Document, MalformedRowPolicy, TableKind, format, load_records,
};
use hr_assistant_embed::{EmbedConfig, EmbedError, EmbeddingProvider, create_provider};
use hr_assistant_retriever::{IndexReport, IndexStore};
use std::sync::Arc;
use std::time::Duration;

/// Picks the spreadsheet backend: a local workbook if configured, else Google Sheets.
pub fn sheet_backend(
    config: &SheetsConfig,
) -> Result<(Arc<dyn SheetSource>, Arc<dyn InteractionLog>)> {
    if let Some(dir) = &config.workbook_dir {
        tracing::info!("Using local workbook at {}", dir.display());
        let workbook = Arc::new(LocalWorkbook::new(dir.clone()));
        return Ok((workbook.clone(), workbook));
    }

    let spreadsheet = config.spreadsheet.as_deref().ok_or_else(|| {
        AssistantError::config(
            "no spreadsheet configured: set [sheets].spreadsheet, HR_ASSISTANT_SPREADSHEET or --workbook",
        )
    })?;
    let token = config.access_token.as_deref().unwrap_or_default();
    let sheets = GoogleSheets::new(spreadsheet, token, Duration::from_secs(config.timeout_secs))?
        .with_base_url(config.base_url.clone());
    tracing::info!("Using Google spreadsheet {}", sheets.spreadsheet_id());
    let sheets = Arc::new(sheets);
    Ok((sheets.clone(), sheets))
}

/// Creates the embedding provider; configuration mistakes surface as `Config`.
pub async fn embedding_provider(config: &EmbedConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    create_provider(config.clone().with_api_key_from_env())
        .await
        .map_err(|err| match err {
            EmbedError::InvalidConfig { message } => AssistantError::config(message),
            other => AssistantError::index(other),
        })
}

pub fn chat_model(config: &GenerationConfig) -> Result<Arc<dyn GenerativeModel>> {
    let api_key = config.api_key.as_deref().unwrap_or_default();
    let model = OpenAiChatModel::new(
        api_key,
        config.model.clone(),
        &config.base_url,
        Duration::from_secs(config.timeout_secs),
    )
    .map_err(|err| AssistantError::config(err.to_string()))?;
    Ok(Arc::new(model))
}

/// Reads every HR table and formats each record as a document.
///
/// Tables are read in [`TableKind::ALL`] order, rows in sheet order.
pub async fn load_documents(
    source: &dyn SheetSource,
    policy: MalformedRowPolicy,
) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for table in TableKind::ALL {
        let rows = source.fetch_table(table).await?;
        let records = load_records(table, &rows, policy)?;
        tracing::info!("{}: {} records", table, records.len());
        documents.extend(records.iter().map(format));
    }
    Ok(documents)
}

/// Loads, chunks and indexes the HR corpus.
pub async fn build_index(
    config: &AppConfig,
    source: &dyn SheetSource,
    index: &IndexStore,
) -> Result<IndexReport> {
    let documents = load_documents(source, config.sheets.malformed_rows).await?;
    let builder = CorpusBuilder::new(config.chunking.clone())?;
    let chunks: Vec<Chunk> = builder.build(&documents);
    tracing::info!(
        "Split {} documents into {} chunks",
        documents.len(),
        chunks.len()
    );
    index.index(&chunks).await.map_err(AssistantError::index)
}

/// Everything a running assistant owns.
pub struct AppContext {
    config: AppConfig,
    index: Arc<IndexStore>,
    assistant: Assistant,
    report: IndexReport,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("index", &self.index)
            .field("report", &self.report)
            .finish()
    }
}

impl AppContext {
    /// Connects every collaborator named in `config` and builds the index.
    pub async fn init(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let (source, log) = sheet_backend(&config.sheets)?;
        let provider = embedding_provider(&config.embedding).await?;
        let model = chat_model(&config.generation)?;
        Self::from_parts(config, source.as_ref(), log, provider, model).await
    }

    /// Builds the index and wires the assistant from ready-made collaborators.
    pub async fn from_parts(
        config: AppConfig,
        source: &dyn SheetSource,
        log: Arc<dyn InteractionLog>,
        provider: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn GenerativeModel>,
    ) -> Result<Self> {
        config.validate()?;
        let index = IndexStore::open(&config.index.dir, provider)
            .await
            .map_err(AssistantError::index)?;
        let index = Arc::new(index);
        let report = build_index(&config, source, &index).await?;

        let answerer = Answerer::new(index.clone(), model, config.retrieval.top_k)
            .with_sampling(config.generation.temperature, config.generation.max_tokens);
        let assistant = Assistant::new(answerer, InteractionLogger::new(log));

        tracing::info!(
            "Assistant ready: {} chunks indexed{}",
            report.chunk_count,
            if report.reused { " (reused)" } else { "" }
        );
        Ok(Self {
            config,
            index,
            assistant,
            report,
        })
    }

    pub fn assistant(&self) -> &Assistant {
        &self.assistant
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn index(&self) -> &IndexStore {
        &self.index
    }

    /// What the startup build did
    pub fn report(&self) -> &IndexReport {
        &self.report
    }

    pub async fn shutdown(self) {
        self.index.close().await;
    }
}
