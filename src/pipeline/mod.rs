//! Advisory pipeline.
//!
//! One run handles one email:
//! 1. `MailboxGateway::fetch_latest_unread()` — via the handoff file
//! 2. `Categorizer::categorize()` — closed-set label, `Non-standard` on any failure
//! 3. Decide — `Non-standard` stops here
//! 4. `DataFetcher::fetch()` — JSON-RPC tool calls for the category
//! 5. `AdvisorTable::dispatch()` — one advisor, one completion call
//! 6. `ReplyComposer::compose()` + `MailboxGateway::send_reply()`

pub mod categorizer;
pub mod composer;
pub mod fetcher;
pub mod jsonrpc;
pub mod orchestrator;
pub mod tools;
pub mod types;

pub use categorizer::Categorizer;
pub use composer::ReplyComposer;
pub use fetcher::DataFetcher;
pub use jsonrpc::{JsonRpcToolClient, ToolSource};
pub use orchestrator::Orchestrator;
