//! Ingestion progress reporting.
//!
//! Progress goes to **stderr** so stdout remains parseable for scripts.
//! `medrag ingest` picks human output when stderr is a TTY, JSON lines with
//! `--json`, and nothing otherwise.

use std::io::Write;

use medrag_core::ingest::{IngestEvent, IngestProgress};

/// Human-friendly progress on stderr: "ingest  embedding  1,234 / 5,000 chunks".
pub struct StderrProgress;

impl IngestProgress for StderrProgress {
    fn report(&self, event: IngestEvent) {
        let line = match &event {
            IngestEvent::Chunked { total } => {
                format!("ingest  chunked  {} chunks\n", format_number(*total))
            }
            IngestEvent::Embedded { done, total } => format!(
                "ingest  embedding  {} / {} chunks\n",
                format_number(*done),
                format_number(*total)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IngestProgress for JsonProgress {
    fn report(&self, event: IngestEvent) {
        let obj = match &event {
            IngestEvent::Chunked { total } => serde_json::json!({
                "event": "progress",
                "phase": "chunked",
                "total": total
            }),
            IngestEvent::Embedded { done, total } => serde_json::json!({
                "event": "progress",
                "phase": "embedding",
                "n": done,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// `--json` wins; otherwise human progress only when stderr is a TTY.
    pub fn select(json: bool) -> Self {
        if json {
            ProgressMode::Json
        } else if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn IngestProgress> {
        match self {
            ProgressMode::Off => Box::new(medrag_core::ingest::NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn json_flag_selects_json() {
        assert_eq!(ProgressMode::select(true), ProgressMode::Json);
    }
}
