use crate::lesson::{Checkpoint, CheckpointType};
use crate::services::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GradingState {
    /// Answer entry is open; the video is paused.
    Collecting,
    /// Submission is in flight with the grading collaborator.
    Submitting,
    /// Terminal. Closing the session marks the checkpoint complete and
    /// resumes playback.
    Passed,
    /// The video stays paused until the user retries and passes, or abandons
    /// the lesson.
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    pub feedback: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitRequest {
    pub checkpoint_id: String,
    pub checkpoint_topic: String,
    pub checkpoint_type: CheckpointType,
    pub answer_text: String,
}

const TRANSPORT_FAILURE_FEEDBACK: &str =
    "An error occurred while grading. Please try again.";

/// One checkpoint encounter: collect an answer, submit it for grading,
/// show pass/fail, allow retry on fail. Entered text lives with the UI
/// editors so a retry keeps it; the session only records the lifecycle.
pub struct GradingSession {
    pub checkpoint: Checkpoint,
    /// Unique per session, bumped by the owner for every new modal; a
    /// verdict tagged for an earlier session is discarded instead of
    /// applied.
    pub generation: u64,
    state: GradingState,
    feedback: String,
}

impl GradingSession {
    pub fn new(checkpoint: Checkpoint, generation: u64) -> Self {
        Self {
            checkpoint,
            generation,
            state: GradingState::Collecting,
            feedback: String::new(),
        }
    }

    pub fn state(&self) -> GradingState {
        self.state
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    /// Validation gate: quiz needs a non-empty answer, project needs a
    /// non-empty link (description optional).
    pub fn can_submit(&self, answer: &str, link: &str) -> bool {
        if self.state != GradingState::Collecting {
            return false;
        }
        match self.checkpoint.kind {
            CheckpointType::Quiz => !answer.trim().is_empty(),
            CheckpointType::Project => !link.trim().is_empty(),
        }
    }

    /// Move to Submitting and build the grading request, or None when the
    /// validation gate rejects. No upstream call happens on rejection.
    pub fn begin_submit(&mut self, answer: &str, link: &str) -> Option<SubmitRequest> {
        if !self.can_submit(answer, link) {
            return None;
        }
        self.state = GradingState::Submitting;
        self.feedback.clear();

        let answer_text = match self.checkpoint.kind {
            CheckpointType::Quiz => answer.to_string(),
            CheckpointType::Project => {
                format!("Google Drive Link: {link}\n\nDescription: {answer}")
            }
        };
        Some(SubmitRequest {
            checkpoint_id: self.checkpoint.id.clone(),
            checkpoint_topic: self.checkpoint.topic.clone(),
            checkpoint_type: self.checkpoint.kind,
            answer_text,
        })
    }

    /// Apply the grading outcome. Transport or malformed-response errors
    /// become a failed verdict with a generic message; the session is never
    /// left hanging in Submitting.
    pub fn apply_verdict(&mut self, outcome: Result<Verdict, ServiceError>) {
        if self.state != GradingState::Submitting {
            return;
        }
        match outcome {
            Ok(verdict) => {
                self.feedback = verdict.feedback;
                self.state = if verdict.passed {
                    GradingState::Passed
                } else {
                    GradingState::Failed
                };
            }
            Err(_) => {
                self.feedback = TRANSPORT_FAILURE_FEEDBACK.to_string();
                self.state = GradingState::Failed;
            }
        }
    }

    /// Clears prior feedback and reopens answer entry. The UI keeps the
    /// entered text.
    pub fn try_again(&mut self) {
        if self.state == GradingState::Failed {
            self.state = GradingState::Collecting;
            self.feedback.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz() -> Checkpoint {
        Checkpoint {
            id: "cp1".to_string(),
            video_id: "vid".to_string(),
            time_seconds: 120,
            kind: CheckpointType::Quiz,
            topic: "HTML basics".to_string(),
            question: "What does HTML stand for?".to_string(),
        }
    }

    fn project() -> Checkpoint {
        Checkpoint {
            kind: CheckpointType::Project,
            ..quiz()
        }
    }

    #[test]
    fn quiz_requires_nonempty_answer() {
        let mut session = GradingSession::new(quiz(), 1);
        assert!(session.begin_submit("", "").is_none());
        assert!(session.begin_submit("   ", "").is_none());
        assert_eq!(session.state(), GradingState::Collecting);

        let req = session.begin_submit("markup language", "").unwrap();
        assert_eq!(session.state(), GradingState::Submitting);
        assert_eq!(req.answer_text, "markup language");
    }

    #[test]
    fn project_requires_link_description_optional() {
        let mut session = GradingSession::new(project(), 1);
        assert!(session.begin_submit("described it", "").is_none());

        let req = session
            .begin_submit("my page", "https://drive.google.com/x")
            .unwrap();
        assert!(req.answer_text.contains("Google Drive Link: https://drive.google.com/x"));
        assert!(req.answer_text.contains("Description: my page"));
    }

    #[test]
    fn fail_then_retry_then_pass() {
        let mut session = GradingSession::new(quiz(), 1);
        session.begin_submit("wrong answer", "").unwrap();
        session.apply_verdict(Ok(Verdict {
            passed: false,
            feedback: "X".to_string(),
        }));
        assert_eq!(session.state(), GradingState::Failed);
        assert_eq!(session.feedback(), "X");

        session.try_again();
        assert_eq!(session.state(), GradingState::Collecting);
        assert!(session.feedback().is_empty());

        session.begin_submit("better answer", "").unwrap();
        session.apply_verdict(Ok(Verdict {
            passed: true,
            feedback: "Y".to_string(),
        }));
        assert_eq!(session.state(), GradingState::Passed);
        assert_eq!(session.feedback(), "Y");
    }

    #[test]
    fn transport_failure_becomes_failed_with_generic_feedback() {
        let mut session = GradingSession::new(quiz(), 1);
        session.begin_submit("anything", "").unwrap();
        session.apply_verdict(Err(ServiceError::Malformed("grader")));
        assert_eq!(session.state(), GradingState::Failed);
        assert_eq!(session.feedback(), TRANSPORT_FAILURE_FEEDBACK);
    }

    #[test]
    fn verdict_ignored_unless_submitting() {
        let mut session = GradingSession::new(quiz(), 1);
        session.apply_verdict(Ok(Verdict {
            passed: true,
            feedback: "late".to_string(),
        }));
        assert_eq!(session.state(), GradingState::Collecting);
        assert!(session.feedback().is_empty());
    }

    #[test]
    fn double_submit_is_rejected_while_in_flight() {
        let mut session = GradingSession::new(quiz(), 1);
        assert!(session.begin_submit("first", "").is_some());
        assert!(session.begin_submit("second", "").is_none());
    }

    #[test]
    fn try_again_only_from_failed() {
        let mut session = GradingSession::new(quiz(), 1);
        session.begin_submit("answer", "").unwrap();
        session.try_again();
        assert_eq!(session.state(), GradingState::Submitting);
    }
}
