//! Conversation analysis overlay.
//!
//! Recommendations arrive keyed by position in the transcript that was sent.
//! They are bound to the ids of the messages at those positions when the
//! result lands, and thrown away whenever the list is replaced.

use log::{ debug, warn };

use crate::history::format_transcript;
use crate::models::chat::{ Message, MessageId };
use crate::models::recommendation::{ BoundRecommendation, Recommendation };

pub const MIN_MESSAGES_FOR_ANALYSIS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AnalysisPhase {
    #[default]
    Idle,
    Analyzing,
    ShowingResults,
}

/// What a toggle press resolved to.
#[derive(Debug, PartialEq, Eq)]
pub enum Toggle {
    Hidden,
    Rejected,
    Started(AnalysisTicket),
}

/// Everything needed to finish one analysis request.
#[derive(Debug, PartialEq, Eq)]
pub struct AnalysisTicket {
    generation: u64,
    message_ids: Vec<MessageId>,
    pub transcript: String,
}

#[derive(Debug, Default)]
pub struct AnalysisOverlay {
    phase: AnalysisPhase,
    recommendations: Vec<BoundRecommendation>,
    generation: u64,
}

impl AnalysisOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> AnalysisPhase {
        self.phase
    }

    pub fn is_showing(&self) -> bool {
        self.phase == AnalysisPhase::ShowingResults
    }

    pub fn recommendations(&self) -> &[BoundRecommendation] {
        &self.recommendations
    }

    pub fn can_request(&self, message_count: usize) -> bool {
        self.phase != AnalysisPhase::Analyzing && message_count >= MIN_MESSAGES_FOR_ANALYSIS
    }

    pub fn toggle(&mut self, messages: &[Message]) -> Toggle {
        if self.phase == AnalysisPhase::ShowingResults {
            self.phase = AnalysisPhase::Idle;
            return Toggle::Hidden;
        }
        if !self.can_request(messages.len()) {
            return Toggle::Rejected;
        }
        self.phase = AnalysisPhase::Analyzing;
        self.recommendations.clear();
        Toggle::Started(AnalysisTicket {
            generation: self.generation,
            message_ids: messages
                .iter()
                .map(|m| m.id.clone())
                .collect(),
            transcript: format_transcript(messages),
        })
    }

    /// Binds results to message ids. Returns `false` if the ticket went stale.
    pub fn complete(&mut self, ticket: AnalysisTicket, recommendations: Vec<Recommendation>) -> bool {
        if ticket.generation != self.generation {
            debug!("Dropping analysis results for a replaced message list");
            return false;
        }
        self.recommendations = recommendations
            .into_iter()
            .filter_map(|rec| match ticket.message_ids.get(rec.message_index) {
                Some(id) =>
                    Some(BoundRecommendation {
                        message_id: id.clone(),
                        recommendation: rec,
                    }),
                None => {
                    warn!(
                        "Recommendation points at message {} of {}, skipping",
                        rec.message_index,
                        ticket.message_ids.len()
                    );
                    None
                }
            })
            .collect();
        self.phase = AnalysisPhase::ShowingResults;
        true
    }

    pub fn fail(&mut self, ticket: AnalysisTicket) {
        if ticket.generation == self.generation {
            self.phase = AnalysisPhase::Idle;
        }
    }

    /// Called whenever the message list is replaced wholesale.
    pub fn discard(&mut self) {
        self.generation += 1;
        self.recommendations.clear();
        self.phase = AnalysisPhase::Idle;
    }

    /// Rating shown next to `message`; only user messages carry one.
    pub fn recommendation_for(&self, message: &Message) -> Option<&Recommendation> {
        if !self.is_showing() || !message.is_user() {
            return None;
        }
        self.recommendations
            .iter()
            .find(|bound| bound.message_id == message.id)
            .map(|bound| &bound.recommendation)
    }
}
