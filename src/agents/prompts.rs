//! Role-specific prompt construction.
//!
//! File content and accumulated feedback are wrapped in explicit start/end
//! markers so agents can tell the payload apart from the instructions.

pub const CONTENT_START: &str = "CONTENT START";
pub const CONTENT_END: &str = "CONTENT END";
pub const FEEDBACK_START: &str = "AGENT FEEDBACK START";
pub const FEEDBACK_END: &str = "AGENT FEEDBACK END";

/// Reviewer prompt: instructions plus the literal file content.
pub fn reviewer_prompt(instructions: &str, file_content: &str) -> String {
    format!(
        "{instructions}\n\nReview the following content and provide feedback.\n\n\
         {CONTENT_START}\n{file_content}\n{CONTENT_END}"
    )
}

/// Summarizer prompt: instructions plus the full current feedback.
pub fn summarizer_prompt(instructions: &str, feedback: &str) -> String {
    format!("{instructions}\n\n{FEEDBACK_START}\n\n{feedback}\n{FEEDBACK_END}")
}

/// Implementer prompt: instructions, feedback and file content in delimited
/// sections, instructing an edit.
pub fn implementer_prompt(instructions: &str, feedback: &str, file_content: &str) -> String {
    format!(
        "{instructions}\n\nEdit the content (between {CONTENT_START} and {CONTENT_END}) \
         based on the agent feedback.\n\n\
         {FEEDBACK_START}\n\n{feedback}\n{FEEDBACK_END}\n\n\
         {CONTENT_START}\n{file_content}\n{CONTENT_END}"
    )
}
