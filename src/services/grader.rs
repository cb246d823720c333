use serde::Deserialize;
use tracing::debug;

use crate::lesson::grading::{SubmitRequest, Verdict};
use crate::lesson::CheckpointType;
use crate::router::clean_model_text;
use crate::services::model::ModelService;
use crate::services::{strip_code_fences, ServiceConfig, ServiceError};

#[derive(Deserialize)]
struct RawVerdict {
    passed: bool,
    feedback: String,
}

fn grading_prompt(topic: &str, kind: CheckpointType, answer_text: &str) -> String {
    match kind {
        CheckpointType::Project => format!(
            r#"You are an expert AI tutor acting as an exam grader.
Your response MUST be in strict JSON format.
Do not use any markdown or plain text outside of the JSON.

The learning objective is: "{topic}"
A student was asked to complete this project, upload it to Google Drive, and share the link.

Here is the student's submission:
"{answer_text}"
(This contains their description and the public Google Drive link)

You cannot open the link.
Based *only* on the student's description and the fact they provided a link, evaluate if they likely completed the task.
Be very lenient. If they provided a link and a plausible description, pass them.

Respond with the following JSON structure:
{{
  "passed": true or false,
  "feedback": "A short, one-sentence feedback for the student. If they pass, congratulate them on completing the project."
}}"#
        ),
        CheckpointType::Quiz => format!(
            r#"You are an expert AI tutor acting as an exam grader.
Your response MUST be in strict JSON format.
Do not use any markdown or plain text outside of the JSON.

The learning objective is: "{topic}"

Here is the student's answer:
"{answer_text}"

Evaluate if the student's answer correctly demonstrates understanding of the learning objective.
Be lenient; as long as they seem to grasp the core concept, let them pass.

Respond with the following JSON structure:
{{
  "passed": true or false,
  "feedback": "A short, one-sentence feedback for the student, explaining why they passed or what they missed. Keep it friendly and concise."
}}"#
        ),
    }
}

/// Parse the grader's strict-JSON verdict. Malformed output is an error
/// distinct from a graded "fail".
pub fn parse_verdict(text: &str) -> Result<Verdict, ServiceError> {
    let cleaned = strip_code_fences(text);
    let raw: RawVerdict =
        serde_json::from_str(&cleaned).map_err(|_| ServiceError::Malformed("grader"))?;
    Ok(Verdict {
        passed: raw.passed,
        feedback: clean_model_text(&raw.feedback),
    })
}

/// Submit one checkpoint answer to the grading collaborator.
pub fn grade(cfg: &ServiceConfig, request: &SubmitRequest) -> Result<Verdict, ServiceError> {
    let prompt = grading_prompt(
        &request.checkpoint_topic,
        request.checkpoint_type,
        &request.answer_text,
    );
    let model = ModelService::new(cfg);
    let text = model.generate(&prompt)?;
    let verdict = parse_verdict(&text)?;
    debug!(checkpoint = %request.checkpoint_id, passed = verdict.passed, "graded");
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_verdict() {
        let verdict = parse_verdict(r#"{"passed": true, "feedback": "Nice work."}"#).unwrap();
        assert!(verdict.passed);
        assert_eq!(verdict.feedback, "Nice work.");
    }

    #[test]
    fn parses_fenced_verdict_and_cleans_feedback() {
        let text = "```json\n{\"passed\": false, \"feedback\": \"You missed the **core** idea.\"}\n```";
        let verdict = parse_verdict(text).unwrap();
        assert!(!verdict.passed);
        assert_eq!(verdict.feedback, "You missed the core idea.");
    }

    #[test]
    fn malformed_verdict_is_error_not_fail() {
        let err = parse_verdict("The student did great!").unwrap_err();
        assert!(matches!(err, ServiceError::Malformed("grader")));
    }

    #[test]
    fn project_prompt_differs_from_quiz_prompt() {
        let quiz = grading_prompt("topic", CheckpointType::Quiz, "answer");
        let project = grading_prompt("topic", CheckpointType::Project, "answer");
        assert!(project.contains("Google Drive"));
        assert!(!quiz.contains("Google Drive"));
        assert!(quiz.contains("strict JSON"));
    }
}
