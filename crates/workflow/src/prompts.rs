//! Prompt templates. Placeholders are `{name}` and filled with [`render`].

pub const CLASSIFY: &str = "\
Classify the user intent into ONE of the following:
- PRODUCTION_QUERY
- DOWNTIME_QUERY
- CREATE_TICKET
- UNKNOWN

Conversation context (JSON):
{memory}

User message:
{input}

Return ONLY the intent label.";

pub const EXTRACT_LINE_DATE: &str = "\
Extract the production line code and the date the user is asking about.
Today is {today}. Resolve relative dates such as \"yesterday\" against today.
If no line is mentioned use {default_line}.

User message:
{input}

Reply in the form LINE|YYYY-MM-DD and nothing else.";

pub const EXTRACT_TICKET: &str = "\
Extract maintenance ticket fields from the user message.
Severity is one of Low, Medium, High, Critical.
If no line is mentioned use {default_line}.

User message:
{input}

Reply with JSON only: {\"line_code\": \"...\", \"issue\": \"...\", \"severity\": \"...\"}";

pub const SUMMARIZE_PRODUCTION: &str = "\
Summarize the production data below for a plant supervisor in one or two sentences.
Mention the good and reject quantities.

Question:
{input}

Data (JSON):
{data}";

pub const SUMMARIZE_DOWNTIME: &str = "\
Summarize the downtime data below for a plant supervisor in a few sentences.
Lead with the largest downtime reason.

Question:
{input}

Data (JSON):
{data}";

pub const ANSWER_FROM_DOCS: &str = "\
Answer the question using only the documentation excerpts below.
If they do not contain the answer, say so.

Question:
{input}

Documentation:
{docs}";

/// Replace each `{key}` in `template` with its value.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}
