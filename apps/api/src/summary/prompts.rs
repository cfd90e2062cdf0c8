// CV summary prompt templates.

pub const CV_SUMMARY_SYSTEM: &str = "\
You are an experienced technical recruiter. \
You write short, factual professional summaries of CVs. \
Use only facts present in the CV. Never invent employers, dates, degrees or metrics.";

pub const CV_SUMMARY_PROMPT: &str = r#"Write a professional summary of the following CV.

CV:
{cv_text}

REQUIREMENTS:
- 3 to 5 sentences, third person.
- Lead with current role and years of experience if stated.
- Mention the strongest skills and the most relevant achievements.
- If the CV text is garbled or incomplete, summarise what is readable and say nothing about the rest."#;

/// Builds the full system prompt for the summary call.
pub fn summary_system() -> String {
    format!(
        "{} {}",
        CV_SUMMARY_SYSTEM,
        crate::llm_client::prompts::PLAIN_TEXT_SYSTEM
    )
}

pub fn summary_prompt(cv_text: &str) -> String {
    CV_SUMMARY_PROMPT.replace("{cv_text}", cv_text.trim())
}
