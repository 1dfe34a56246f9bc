//! Prompt text sent to the search agent and the summarizer.

use crate::models::SearchOptions;

/// Upper bound on article text sent for summarization.
pub const SUMMARY_INPUT_CHARS: usize = 12_000;

/// Build the user prompt for one search pass.
pub fn search_prompt(query: &str, options: &SearchOptions, count: usize) -> String {
    format!(
        r#"Use the news search tool to find the latest news matching the query below.
- market: {market}
- freshness: {freshness}
- count: {count}

Output ONLY a JSON array in exactly this shape. No explanation, no comments, no code fences, no text before or after.
If nothing matches, output an empty array [] and nothing else.
[
  {{"title": "...", "snippet": "...", "source": "...", "published": "YYYY-MM-DDTHH:MM:SSZ", "url": "..."}}
]
Do not guess: leave a field as an empty string when it is unknown.
query: {query}"#,
        market = options.market,
        freshness = options.freshness,
    )
}

/// Build the prompt asking for a summary and a sentiment label.
pub fn summary_prompt(article_text: &str) -> String {
    let text: String = article_text.chars().take(SUMMARY_INPUT_CHARS).collect();
    format!(
        r#"Summarize the news item below in two or three sentences, in the language it is written in, and classify its overall tone.
Output ONLY a JSON object of the form {{"summary": "...", "sentiment": "positive" | "negative" | "neutral"}}.

{text}"#
    )
}
