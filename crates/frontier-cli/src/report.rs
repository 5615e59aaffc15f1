use frontier_crawler::{CrawlSummary, FetchOutcome};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct OutcomeRecord<'a> {
    id: &'a str,
    depth: usize,
    found: bool,
    body: &'a str,
    links: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> From<&'a FetchOutcome<String>> for OutcomeRecord<'a> {
    fn from(outcome: &'a FetchOutcome<String>) -> Self {
        Self {
            id: &outcome.id,
            depth: outcome.depth,
            found: outcome.is_found(),
            body: outcome.body(),
            links: outcome.links(),
            error: outcome.error().map(|e| format!("{:#}", e.cause)),
        }
    }
}

pub fn render(outcome: &FetchOutcome<String>, json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string(&OutcomeRecord::from(outcome))?);
    }
    let line = match &outcome.result {
        Ok(page) => format!("found: {} {:?}", outcome.id, page.body),
        Err(_) => format!("not found: {}", outcome.id),
    };
    Ok(line)
}

pub fn print(outcome: &FetchOutcome<String>, json: bool) {
    match render(outcome, json) {
        Ok(line) => println!("{line}"),
        Err(e) => log::error!("Couldn't report {} got: {e}", outcome.id),
    }
}

pub fn summary(summary: &CrawlSummary) -> String {
    format!(
        "{} found, {} not found, {} total",
        summary.found,
        summary.not_found,
        summary.total()
    )
}
