// Prompt fragments shared by every generation request.
// Document-specific prompts live next to the generator in generation/prompts.rs.

/// Appended to every system prompt: the reply must be a bare JSON object.
pub const JSON_OBJECT_SYSTEM: &str = "\
    Respond with a single JSON object and nothing else. \
    Every value must be a string or an array of strings. \
    Do not add commentary before or after the JSON.";

/// Editing constraints common to resumes and cover letters.
pub const PRESERVE_STRUCTURE_INSTRUCTION: &str = "\
    Make subtle, professional edits. Do NOT rewrite sections from scratch; keep \
    the original structure, ordering and most of the wording. Weave relevant \
    keywords from the job description naturally into the existing text. \
    Do NOT change personal information or contact details.";
