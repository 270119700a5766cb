use dataset_search_client::{DatasetHit, ResultSet, SearchError, SearchHandler, StreamEvent};

/// Prints the loading, ranked and reranked phases as they arrive.
pub struct ConsoleHandler {
    json: bool,
    limit: usize,
    show_events: bool,
}

impl ConsoleHandler {
    pub fn new(json: bool, limit: usize, show_events: bool) -> Self {
        Self {
            json,
            limit,
            show_events,
        }
    }

    pub fn loading(&self, query: &str) {
        if !self.json {
            println!("Searching datasets for {query:?}...");
        }
    }

    pub fn finished(&self, results: &ResultSet) -> Result<(), serde_json::Error> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(results)?);
        } else if let Some(line) = summary_line(results) {
            println!("\n{line}");
        }
        Ok(())
    }

    fn print_hits(&self, heading: &str, results: &ResultSet) {
        if self.json {
            return;
        }
        println!("\n== {heading} ({} hits) ==", results.len());
        for (rank, hit) in results.hits.iter().take(self.limit).enumerate() {
            println!("{:>3}. {}", rank + 1, describe(hit));
        }
        if results.len() > self.limit {
            println!("     ... {} more", results.len() - self.limit);
        }
    }
}

fn summary_line(results: &ResultSet) -> Option<String> {
    results
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("Summary: {s}"))
}

fn describe(hit: &DatasetHit) -> String {
    let title = hit.display_title().unwrap_or("(untitled)");
    let mut line = format!("{title} [score {:.2}]", hit.rank_score());
    if let Some(doi) = hit.source.doi.as_deref() {
        line.push_str(&format!(" doi:{doi}"));
    }
    line
}

impl SearchHandler for ConsoleHandler {
    fn on_event(&mut self, event: &StreamEvent) {
        if self.show_events {
            eprintln!("event: {}", event.kind);
        }
    }

    fn on_search_data(&mut self, results: &ResultSet) {
        self.print_hits("Ranked results (reranking...)", results);
    }

    fn on_reranked_data(&mut self, results: &ResultSet) {
        self.print_hits("Reranked results", results);
    }

    fn on_error(&mut self, error: &SearchError) {
        if error.is_fatal() {
            eprintln!("Search failed: {error}");
        } else {
            eprintln!("Backend warning: {error}");
        }
    }
}
