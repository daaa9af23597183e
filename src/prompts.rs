//! Prompts sent to the completion service.
//!
//! Keeping every prompt here means wording changes touch exactly one file and
//! tests can inspect the exact text without a live model.

/// Fields the event extractor asks the model for, in prompt order.
pub const EVENT_FIELDS: [&str; 5] = ["title", "description", "date", "time", "department"];

/// System prompt for the campus chat bot.
pub const TUT_CHAT_SYSTEM_PROMPT: &str = "You are a friendly assistant specialized in Tshwane University of Technology (TUT). \
Answer questions related to courses, resources, student life, campus info, registration, and academics. \
Provide clear, concise, and helpful responses.";

/// System prompt for the study assistant (ask + summarise).
pub const STUDY_ASSISTANT_SYSTEM_PROMPT: &str = "You are an intelligent academic assistant. \
Provide clear, structured explanations, summaries, and answers \
suitable for students and tutors in South Africa.";

/// Build the single-turn prompt asking for event details as JSON.
///
/// The model is told to emit strict JSON, but the caller still runs the
/// completion through [`crate::pipeline::recover`] because compliance is
/// not guaranteed.
pub fn event_extraction_prompt(text: &str) -> String {
    let fields: String = EVENT_FIELDS.iter().map(|f| format!("- {f}\n")).collect();
    format!(
        "\nYou are an expert event information extractor.\n\
Extract ONLY JSON with the following fields from this text:\n\
{fields}\n\
Output STRICTLY as valid JSON with no extra text, markdown, or comments.\n\n\
TEXT TO ANALYZE:\n\
{text}\n"
    )
}

/// Build the summarisation prompt for (already truncated) study material.
pub fn summary_prompt(material: &str) -> String {
    format!(
        "Summarize the following study material clearly and concisely for a learner:\n\n{material}"
    )
}
