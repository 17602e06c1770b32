//! End-to-end tests over a local CSV workbook.
//!
//! The embedding and chat collaborators are replaced by deterministic fakes;
//! the workbook, chunker and SQLite index are the real ones.

use async_trait::async_trait;
use half::f16;
use hr_assistant::{
    AppConfig, AppContext, AssistantError, GenerationError, GenerationRequest, GenerativeModel,
    LocalWorkbook, LogStatus, Outcome,
};
use hr_assistant_context::{ContextError, MalformedRowPolicy};
use hr_assistant_embed::{EmbeddingProvider, EmbeddingResult};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::{TempDir, tempdir};
use tracing_test::traced_test;

const VOCABULARY: [&str; 6] = ["leave", "sick", "gym", "remote", "travel", "sam"];

const LOG_HEADER: &str = "Timestamp,Query,Answer\n";

struct KeywordProvider {
    calls: AtomicUsize,
}

impl KeywordProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f16> {
        let lower = text.to_lowercase();
        let mut values: Vec<f16> = VOCABULARY
            .iter()
            .map(|word| f16::from_f32(lower.matches(word).count() as f32))
            .collect();
        values.push(f16::from_f32(0.1));
        values
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    async fn embed_text(&self, text: &str) -> hr_assistant_embed::Result<Vec<f16>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    async fn embed_texts(&self, texts: &[String]) -> hr_assistant_embed::Result<EmbeddingResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EmbeddingResult::new(
            texts.iter().map(|t| Self::vector(t)).collect(),
        ))
    }

    fn embedding_dimension(&self) -> usize {
        VOCABULARY.len() + 1
    }

    fn provider_name(&self) -> &str {
        "keyword"
    }

    fn model_name(&self) -> &str {
        "keyword-v1"
    }
}

/// Returns a canned answer, or fails when it has none, recording every prompt.
struct ScriptedModel {
    answer: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.answer.clone().ok_or(GenerationError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

struct Workbook {
    dir: TempDir,
}

impl Workbook {
    fn new() -> Self {
        let workbook = Self {
            dir: tempdir().unwrap(),
        };
        workbook.write(
            "Policies",
            "Title,Section,Content\n\
             Remote Work,General,Remote work is allowed two days a week.\n\
             Travel,Expenses,Travel must be booked through the portal.\n",
        );
        workbook.write(
            "Benefits",
            "BenefitName,Description,Eligibility,Notes\n\
             Gym,Free gym membership,Full-time,\n",
        );
        workbook.write(
            "LeaveBalances",
            "EmployeeEmail,CasualLeave,SickLeave,LastUpdated\n\
             sam@example.com,4,9,2024-03-01\n",
        );
        workbook.write("Logs", LOG_HEADER);
        workbook
    }

    fn write(&self, table: &str, content: &str) {
        std::fs::write(self.path().join(format!("{table}.csv")), content).unwrap();
    }

    fn remove(&self, table: &str) {
        std::fs::remove_file(self.path().join(format!("{table}.csv"))).unwrap();
    }

    fn read(&self, table: &str) -> String {
        std::fs::read_to_string(self.path().join(format!("{table}.csv"))).unwrap()
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn config(&self, index_dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.sheets.workbook_dir = Some(self.path().to_path_buf());
        config.index.dir = index_dir.to_path_buf();
        config.chunking.max_chunk_size = 120;
        config.chunking.overlap = 10;
        config
    }
}

async fn start(
    config: AppConfig,
    workbook: &Workbook,
    provider: Arc<KeywordProvider>,
    model: Arc<ScriptedModel>,
) -> hr_assistant::Result<AppContext> {
    let local = LocalWorkbook::new(workbook.path());
    AppContext::from_parts(config, &local, Arc::new(local.clone()), provider, model).await
}

#[tokio::test]
async fn test_leave_question_is_answered_and_logged() {
    let workbook = Workbook::new();
    let index_dir = tempdir().unwrap();
    let model = ScriptedModel::answering("You have 9 sick days left.");
    let context = start(
        workbook.config(index_dir.path()),
        &workbook,
        KeywordProvider::new(),
        model.clone(),
    )
    .await
    .unwrap();
    assert!(context.report().chunk_count > 1);

    let outcome = context
        .assistant()
        .ask("How much sick leave does sam have?")
        .await;
    let (result, logged) = match outcome {
        Outcome::Answered { result, logged } => (result, logged),
        Outcome::Failed(err) => panic!("expected an answer, got {err}"),
    };

    assert_eq!(result.answer, "You have 9 sick days left.");
    assert!(!result.sources.is_empty());
    assert!(result.sources.len() <= 4);
    assert!(result.sources[0].text.contains("sam@example.com"));

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Leave balance for sam@example.com: Casual=4, Sick=9"));
    assert!(prompts[0].ends_with("Question: How much sick leave does sam have?\nHelpful Answer:"));

    let LogStatus::Logged(entry) = logged else {
        panic!("expected the interaction to be logged");
    };
    let log = workbook.read("Logs");
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        format!(
            "{},How much sick leave does sam have?,You have 9 sick days left.",
            entry.timestamp
        )
    );

    context.shutdown().await;
}

#[tokio::test]
#[traced_test]
async fn test_missing_logs_table_still_answers() {
    let workbook = Workbook::new();
    workbook.remove("Logs");
    let index_dir = tempdir().unwrap();
    let context = start(
        workbook.config(index_dir.path()),
        &workbook,
        KeywordProvider::new(),
        ScriptedModel::answering("Two days a week."),
    )
    .await
    .unwrap();

    match context.assistant().ask("Can I work remote?").await {
        Outcome::Answered {
            result,
            logged: LogStatus::Failed(warning),
        } => {
            assert_eq!(result.answer, "Two days a week.");
            assert!(warning.contains("Logs"));
        }
        other => panic!("expected an answer with a logging warning, got {other:?}"),
    }
    assert!(logs_contain("Could not log interaction"));
    assert!(!workbook.path().join("Logs.csv").exists());
}

#[tokio::test]
async fn test_generation_failure_logs_nothing() {
    let workbook = Workbook::new();
    let index_dir = tempdir().unwrap();
    let context = start(
        workbook.config(index_dir.path()),
        &workbook,
        KeywordProvider::new(),
        ScriptedModel::failing(),
    )
    .await
    .unwrap();

    let outcome = context.assistant().ask("Is there a gym benefit?").await;
    assert!(matches!(
        outcome,
        Outcome::Failed(AssistantError::Generation(GenerationError::EmptyResponse))
    ));
    assert_eq!(workbook.read("Logs"), LOG_HEADER);
}

#[tokio::test]
async fn test_blank_query_calls_no_collaborator() {
    let workbook = Workbook::new();
    let index_dir = tempdir().unwrap();
    let provider = KeywordProvider::new();
    let model = ScriptedModel::answering("unused");
    let context = start(
        workbook.config(index_dir.path()),
        &workbook,
        provider.clone(),
        model.clone(),
    )
    .await
    .unwrap();
    let calls_after_build = provider.calls();

    let outcome = context.assistant().ask("   \n").await;
    assert!(matches!(
        outcome,
        Outcome::Failed(AssistantError::InvalidQuery { .. })
    ));
    assert_eq!(provider.calls(), calls_after_build);
    assert!(model.prompts().is_empty());
    assert_eq!(workbook.read("Logs"), LOG_HEADER);
}

#[tokio::test]
async fn test_empty_tables_send_bare_question() {
    let workbook = Workbook::new();
    workbook.write("Policies", "Title,Section,Content\n");
    workbook.write("Benefits", "BenefitName,Description,Eligibility,Notes\n");
    workbook.write("LeaveBalances", "EmployeeEmail,CasualLeave,SickLeave,LastUpdated\n");
    let index_dir = tempdir().unwrap();
    let model = ScriptedModel::answering("I don't know.");
    let context = start(
        workbook.config(index_dir.path()),
        &workbook,
        KeywordProvider::new(),
        model.clone(),
    )
    .await
    .unwrap();
    assert_eq!(context.report().chunk_count, 0);

    let outcome = context.assistant().ask("What is the dress code?").await;
    let result = match outcome {
        Outcome::Answered { result, .. } => result,
        Outcome::Failed(err) => panic!("expected an answer, got {err}"),
    };
    assert!(result.sources.is_empty());
    assert_eq!(model.prompts(), vec!["What is the dress code?".to_string()]);
}

#[tokio::test]
async fn test_malformed_table_fails_or_is_skipped() {
    let workbook = Workbook::new();
    workbook.write(
        "Benefits",
        "BenefitName,Description,Eligibility\nGym,Free gym membership,Full-time\n",
    );

    let index_dir = tempdir().unwrap();
    let err = start(
        workbook.config(index_dir.path()),
        &workbook,
        KeywordProvider::new(),
        ScriptedModel::answering("unused"),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AssistantError::Schema(ContextError::Schema { field: "Notes", row: 2, .. })
    ));

    let mut config = workbook.config(index_dir.path());
    config.sheets.malformed_rows = MalformedRowPolicy::Skip;
    let model = ScriptedModel::answering("No gym benefit is listed.");
    let context = start(config, &workbook, KeywordProvider::new(), model.clone())
        .await
        .unwrap();

    assert!(context.report().chunk_count > 0);
    assert!(context.assistant().ask("Is there a gym benefit?").await.is_answered());
    assert!(!model.prompts()[0].contains("Benefit: Gym"));
}

#[tokio::test]
async fn test_restart_reuses_index() {
    let workbook = Workbook::new();
    let index_dir = tempdir().unwrap();

    let first = start(
        workbook.config(index_dir.path()),
        &workbook,
        KeywordProvider::new(),
        ScriptedModel::answering("a"),
    )
    .await
    .unwrap();
    assert!(!first.report().reused);
    first.shutdown().await;

    let provider = KeywordProvider::new();
    let second = start(
        workbook.config(index_dir.path()),
        &workbook,
        provider.clone(),
        ScriptedModel::answering("a"),
    )
    .await
    .unwrap();
    assert!(second.report().reused);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_missing_workbook_table_aborts_startup() {
    let workbook = Workbook::new();
    workbook.remove("Policies");
    let index_dir = tempdir().unwrap();

    let err = start(
        workbook.config(index_dir.path()),
        &workbook,
        KeywordProvider::new(),
        ScriptedModel::answering("unused"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AssistantError::Sheet(_)));
}

#[tokio::test]
async fn test_zero_top_k_aborts_startup() {
    let workbook = Workbook::new();
    let index_dir = tempdir().unwrap();
    let provider = KeywordProvider::new();
    let mut config = workbook.config(index_dir.path());
    config.retrieval.top_k = 0;

    let err = start(config, &workbook, provider.clone(), ScriptedModel::answering("unused"))
        .await
        .unwrap_err();
    assert!(matches!(err, AssistantError::Config { .. }));
    assert_eq!(provider.calls(), 0);
}
