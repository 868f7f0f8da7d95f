//! Topic map table codec.
//!
//! The topic map is a comma-separated table with a fixed 17-column header.
//! Fields containing a comma, pipe, quote or line break are quoted, with
//! embedded quotes doubled. `|` separates items inside multi-valued cells.
//! Reading is by header name, so column order in hand-edited files does not
//! matter and unknown columns are ignored.

use crate::content::{
    DEFAULT_PRIORITY, DEFAULT_WORD_COUNT_MAX, DEFAULT_WORD_COUNT_MIN, TopicMapEntry,
};
use crate::error::TopicMapError;
use tracing::warn;

/// Required header, in output order.
pub const TOPIC_MAP_COLUMNS: [&str; 17] = [
    "topic_level",
    "parent_cluster",
    "topic_name",
    "primary_keyword",
    "secondary_keywords",
    "search_intent",
    "content_type",
    "word_count_min",
    "word_count_max",
    "target_entities",
    "questions_to_answer",
    "information_gain_opportunity",
    "rag_optimization_notes",
    "internal_link_targets",
    "priority_score",
    "competition_level",
    "serp_features_opportunity",
];

/// Split table text into records of raw cells.
///
/// Blank lines are skipped. Quoted fields may span lines.
pub fn read_records(text: &str) -> Result<Vec<Vec<String>>, TopicMapError> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut row = 1;
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                field_started = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                field_started = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                finish_record(&mut records, &mut record, &mut field, field_started);
                field_started = false;
                row += 1;
            }
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }

    if in_quotes {
        return Err(TopicMapError::UnterminatedQuote { row });
    }
    finish_record(&mut records, &mut record, &mut field, field_started);
    Ok(records)
}

fn finish_record(
    records: &mut Vec<Vec<String>>,
    record: &mut Vec<String>,
    field: &mut String,
    field_started: bool,
) {
    if !field_started && record.is_empty() && field.is_empty() {
        return;
    }
    record.push(std::mem::take(field));
    records.push(std::mem::take(record));
}

/// Required columns absent from `header` (cells are compared trimmed).
pub fn missing_columns<S: AsRef<str>>(header: &[S]) -> Vec<&'static str> {
    TOPIC_MAP_COLUMNS
        .iter()
        .copied()
        .filter(|col| !header.iter().any(|h| h.as_ref().trim() == *col))
        .collect()
}

/// Parse a topic map. A non-numeric count or score, or a row that breaks
/// the entry invariants, fails the whole parse. Unrecognised labels fall
/// back to the column default.
pub fn parse_topic_map(text: &str) -> Result<Vec<TopicMapEntry>, TopicMapError> {
    let mut records = read_records(text)?.into_iter();
    let header = records.next().ok_or(TopicMapError::Empty)?;
    let header: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

    if !header.iter().any(|h| h == "topic_name") {
        return Err(TopicMapError::MissingColumns(vec!["topic_name".into()]));
    }

    let mut entries = Vec::new();
    for (i, record) in records.enumerate() {
        let row = i + 2;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let cells = Cells { header: &header, record: &record, row };
        entries.push(cells.entry()?);
    }
    Ok(entries)
}

struct Cells<'a> {
    header: &'a [String],
    record: &'a [String],
    row: usize,
}

impl Cells<'_> {
    fn text(&self, column: &str) -> String {
        self.header
            .iter()
            .position(|h| h == column)
            .and_then(|i| self.record.get(i))
            .map(|cell| cell.trim().to_string())
            .unwrap_or_default()
    }

    fn label<T: std::str::FromStr + Default + std::fmt::Display>(&self, column: &str) -> T {
        let value = self.text(column);
        if value.is_empty() {
            return T::default();
        }
        value.parse().unwrap_or_else(|_| {
            let fallback = T::default();
            warn!(row = self.row, column, value = %value, fallback = %fallback, "Unrecognised topic map label");
            fallback
        })
    }

    fn number<T: std::str::FromStr>(&self, column: &str, default: T) -> Result<T, TopicMapError> {
        let value = self.text(column);
        if value.is_empty() {
            return Ok(default);
        }
        value.parse().map_err(|_| self.invalid(column, value))
    }

    fn invalid(&self, column: &str, value: String) -> TopicMapError {
        TopicMapError::InvalidValue {
            row: self.row,
            column: column.to_string(),
            value,
        }
    }

    fn entry(&self) -> Result<TopicMapEntry, TopicMapError> {
        let topic_name = self.text("topic_name");
        if topic_name.is_empty() {
            return Err(TopicMapError::InvalidRow {
                row: self.row,
                reason: "topic_name is empty".into(),
            });
        }

        let entry = TopicMapEntry {
            topic_level: self.label("topic_level"),
            parent_cluster: self.text("parent_cluster"),
            topic_name,
            primary_keyword: self.text("primary_keyword"),
            secondary_keywords: self.text("secondary_keywords"),
            search_intent: self.label("search_intent"),
            content_type: self.label("content_type"),
            word_count_min: self.number("word_count_min", DEFAULT_WORD_COUNT_MIN)?,
            word_count_max: self.number("word_count_max", DEFAULT_WORD_COUNT_MAX)?,
            target_entities: self.text("target_entities"),
            questions_to_answer: self.text("questions_to_answer"),
            information_gain_opportunity: self.text("information_gain_opportunity"),
            rag_optimization_notes: self.text("rag_optimization_notes"),
            internal_link_targets: self.text("internal_link_targets"),
            priority_score: self.number("priority_score", DEFAULT_PRIORITY)?,
            competition_level: self.label("competition_level"),
            serp_features_opportunity: self.text("serp_features_opportunity"),
        };

        entry.validate().map_err(|reason| TopicMapError::InvalidRow {
            row: self.row,
            reason,
        })?;
        Ok(entry)
    }
}

/// Render entries as a table with the standard header.
pub fn render_topic_map(entries: &[TopicMapEntry]) -> String {
    let mut out = join_row(TOPIC_MAP_COLUMNS.iter().map(|c| c.to_string()));
    for e in entries {
        out.push_str(&join_row([
            e.topic_level.to_string(),
            e.parent_cluster.clone(),
            e.topic_name.clone(),
            e.primary_keyword.clone(),
            e.secondary_keywords.clone(),
            e.search_intent.to_string(),
            e.content_type.to_string(),
            e.word_count_min.to_string(),
            e.word_count_max.to_string(),
            e.target_entities.clone(),
            e.questions_to_answer.clone(),
            e.information_gain_opportunity.clone(),
            e.rag_optimization_notes.clone(),
            e.internal_link_targets.clone(),
            e.priority_score.to_string(),
            e.competition_level.to_string(),
            e.serp_features_opportunity.clone(),
        ]));
    }
    out
}

fn join_row(cells: impl IntoIterator<Item = String>) -> String {
    let mut line = cells.into_iter().map(|c| escape(&c)).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

fn escape(cell: &str) -> String {
    if cell.contains([',', '|', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
