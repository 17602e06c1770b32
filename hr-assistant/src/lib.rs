//! # hr-assistant
//!
//! A question-answering assistant over an organization's HR spreadsheet.
//!
//! At startup the Policies, Benefits and LeaveBalances tables are read,
//! flattened into one sentence per row, chunked and embedded into a persisted
//! vector index. Each question then retrieves the closest chunks, is answered
//! by a chat model conditioned on them, and is appended to the Logs table.
//!
//! ## Architecture
//!
//! The pipeline is split across the workspace:
//! - [`hr-assistant-context`] turns sheet rows into records, documents and chunks
//! - [`hr-assistant-embed`] provides embedding backends
//! - [`hr-assistant-retriever`] persists chunks with their vectors and ranks them
//! - this crate talks to the spreadsheet and the chat model, and wires it together
//!
//! ## Quick Start
//!
//! ```no_run
//! use hr_assistant::{AppConfig, AppContext, Outcome};
//!
//! # async fn example() -> hr_assistant::Result<()> {
//! let config = AppConfig::load(None)?;
//! let context = AppContext::init(config).await?;
//!
//! match context.assistant().ask("How many sick days do I have left?").await {
//!     Outcome::Answered { result, .. } => println!("{}", result.answer),
//!     Outcome::Failed(err) => eprintln!("{err}"),
//! }
//! context.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See [`config`] for the TOML layout. Credentials come from `OPENAI_API_KEY`
//! and `GOOGLE_SHEETS_TOKEN`; a directory of CSV files can stand in for the
//! spreadsheet via `[sheets].workbook_dir`.

pub mod answerer;
pub mod assistant;
pub mod config;
pub mod context;
pub mod error;
pub mod generation;
pub mod logger;
pub mod sheets;

pub use answerer::{Answerer, QueryResult, build_prompt};
pub use assistant::{Assistant, LogStatus, Outcome};
pub use config::AppConfig;
pub use context::AppContext;
pub use error::{AssistantError, Result};
pub use generation::{GenerationError, GenerationRequest, GenerativeModel, OpenAiChatModel};
pub use logger::{InteractionLogger, LogEntry};
pub use sheets::{GoogleSheets, InteractionLog, LocalWorkbook, SheetError, SheetSource};
