// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// System prompt fragment for answers rendered verbatim as plain text.
pub const PLAIN_TEXT_SYSTEM: &str = "\
    Respond in plain text only. \
    Do NOT use markdown headings, tables or code fences. \
    Do NOT include preambles, explanations or apologies.";
