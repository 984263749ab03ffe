//! Orchestrator — runs the six-stage pipeline for one email.
//!
//! Flow:
//! 1. Fetch the latest unread email, store it in the handoff file, read it back
//! 2. Categorize (never fails; worst case `Non-standard`)
//! 3. Decide: `Non-standard` ends the run here
//! 4. Fetch financial data for the category
//! 5. Dispatch to the category's advisor
//! 6. Compose and send the reply
//!
//! Stages are awaited one after another; nothing runs concurrently. Only
//! mailbox, handoff and send failures abort a run. Everything else ends it
//! with a `RunOutcome` that says why no reply went out.

use std::sync::Arc;

use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::advisors::{AdvisorInput, AdvisorOutcome, AdvisorTable};
use crate::channels::handoff::HandoffFile;
use crate::channels::mailbox::MailboxGateway;
use crate::error::PipelineError;
use crate::pipeline::categorizer::Categorizer;
use crate::pipeline::composer::ReplyComposer;
use crate::pipeline::fetcher::DataFetcher;
use crate::pipeline::types::{Category, InboundMessage, RunOutcome, Stage};

pub struct Orchestrator {
    mailbox: Arc<dyn MailboxGateway>,
    handoff: HandoffFile,
    categorizer: Categorizer,
    fetcher: DataFetcher,
    advisors: AdvisorTable,
    composer: ReplyComposer,
}

impl Orchestrator {
    pub fn new(
        mailbox: Arc<dyn MailboxGateway>,
        handoff: HandoffFile,
        categorizer: Categorizer,
        fetcher: DataFetcher,
        advisors: AdvisorTable,
        composer: ReplyComposer,
    ) -> Self {
        Self {
            mailbox,
            handoff,
            categorizer,
            fetcher,
            advisors,
            composer,
        }
    }

    /// Run once against the mailbox.
    pub async fn run(&self) -> Result<RunOutcome, PipelineError> {
        let run_id = Uuid::new_v4();
        self.run_from_mailbox()
            .instrument(info_span!("run", run_id = %run_id))
            .await
    }

    /// Run on the message stored by the previous run, without touching the
    /// mailbox for reading.
    pub async fn replay(&self) -> Result<RunOutcome, PipelineError> {
        let run_id = Uuid::new_v4();
        self.run_from_handoff()
            .instrument(info_span!("replay", run_id = %run_id))
            .await
    }

    async fn run_from_mailbox(&self) -> Result<RunOutcome, PipelineError> {
        let Some(message) = self.fetch_email().await? else {
            info!(outcome = "no_unread_mail", "Run finished");
            return Ok(RunOutcome::NoUnreadMail);
        };
        self.process(message).await
    }

    async fn run_from_handoff(&self) -> Result<RunOutcome, PipelineError> {
        let message = self.load_handoff().await?;
        info!(
            step = Stage::FetchEmail.step(),
            stage = Stage::FetchEmail.label(),
            path = %self.handoff.path().display(),
            sender = %message.sender_email,
            "Replaying stored email"
        );
        self.process(message).await
    }

    /// Stage 1. The stored copy, not the fetched one, feeds the rest of the run.
    async fn fetch_email(&self) -> Result<Option<InboundMessage>, PipelineError> {
        let Some(fetched) = self
            .mailbox
            .fetch_latest_unread()
            .await
            .map_err(PipelineError::MailboxFetch)?
        else {
            info!(
                step = Stage::FetchEmail.step(),
                stage = Stage::FetchEmail.label(),
                mailbox = self.mailbox.name(),
                "No unread email"
            );
            return Ok(None);
        };

        self.handoff
            .store(&fetched)
            .await
            .map_err(PipelineError::Handoff)?;
        let message = self.load_handoff().await?;

        info!(
            step = Stage::FetchEmail.step(),
            stage = Stage::FetchEmail.label(),
            mailbox = self.mailbox.name(),
            path = %self.handoff.path().display(),
            sender = %message.sender_email,
            "Email fetched and stored"
        );
        Ok(Some(message))
    }

    async fn load_handoff(&self) -> Result<InboundMessage, PipelineError> {
        self.handoff
            .load()
            .await
            .map_err(PipelineError::Handoff)?
            .ok_or_else(|| {
                PipelineError::NothingToReplay(self.handoff.path().display().to_string())
            })
    }

    /// Stages 2 to 6.
    async fn process(&self, message: InboundMessage) -> Result<RunOutcome, PipelineError> {
        // 2. Categorize
        let customer = self
            .categorizer
            .categorize(&message.subject, &message.body)
            .await;
        let category = customer.category;
        info!(
            step = Stage::Categorize.step(),
            stage = Stage::Categorize.label(),
            category = %category,
            "Email categorized"
        );

        // 3. Decide
        if category == Category::NonStandard {
            info!(
                step = Stage::Decide.step(),
                stage = Stage::Decide.label(),
                outcome = "skipped",
                "Non-standard or phishing email, skipping"
            );
            return Ok(RunOutcome::Skipped { category });
        }

        // 4. Fetch data
        let data = self.fetcher.fetch(category, &customer).await;
        info!(
            step = Stage::FetchData.step(),
            stage = Stage::FetchData.label(),
            category = %category,
            tools = data.len(),
            "Financial data fetched"
        );

        // 5. Dispatch
        let input = AdvisorInput {
            message: &message,
            customer: &customer,
            data: &data,
        };
        let Some((advisor, outcome)) = self.advisors.dispatch(category, &input).await else {
            warn!(
                step = Stage::Dispatch.step(),
                stage = Stage::Dispatch.label(),
                category = %category,
                outcome = "no_advisor",
                "No advisor for category, skipping reply"
            );
            return Ok(RunOutcome::NoAdvisor { category });
        };

        let advice = match outcome {
            AdvisorOutcome::Advice(text) if text.trim().is_empty() => {
                warn!(
                    step = Stage::Dispatch.step(),
                    stage = Stage::Dispatch.label(),
                    advisor = %advisor,
                    outcome = "skipped_no_output",
                    "No response generated, skipping reply"
                );
                return Ok(RunOutcome::SkippedNoOutput {
                    category,
                    advisor: advisor.to_string(),
                });
            }
            AdvisorOutcome::Advice(text) => text,
            AdvisorOutcome::Failed { reason } => {
                warn!(
                    step = Stage::Dispatch.step(),
                    stage = Stage::Dispatch.label(),
                    advisor = %advisor,
                    reason = %reason,
                    outcome = "advisor_failed",
                    "Advisor failed, skipping reply"
                );
                return Ok(RunOutcome::AdvisorFailed {
                    category,
                    advisor: advisor.to_string(),
                    reason,
                });
            }
        };
        info!(
            step = Stage::Dispatch.step(),
            stage = Stage::Dispatch.label(),
            advisor = %advisor,
            "Advisor executed"
        );

        // 6. Send reply
        let reply = self.composer.compose(&message, category, &advice).await;
        let message_id = self
            .mailbox
            .send_reply(&reply)
            .await
            .map_err(PipelineError::ReplySend)?;
        info!(
            step = Stage::SendReply.step(),
            stage = Stage::SendReply.label(),
            to = %reply.to,
            message_id = %message_id,
            "Response sent"
        );

        Ok(RunOutcome::Replied {
            category,
            advisor: advisor.to_string(),
            to: reply.to,
            message_id,
        })
    }
}
