//! Splitting long line sequences into display-sized segments.
//!
//! The chat platform limits a message to [`MAX_FIELDS`] fields, each with a
//! title of at most [`MAX_FIELD_TITLE_LENGTH`] characters and a body of at
//! most [`MAX_FIELD_LENGTH`] characters. Lengths are counted in characters,
//! not bytes.

use serde::Serialize;

/// Maximum message description length.
pub const MAX_DESCRIPTION_LENGTH: usize = 2048;
/// Maximum field body length.
pub const MAX_FIELD_LENGTH: usize = 1024;
/// Maximum field title length.
pub const MAX_FIELD_TITLE_LENGTH: usize = 256;
/// Maximum number of fields in one message unit.
pub const MAX_FIELDS: usize = 25;

const ELLIPSIS: char = '…';

/// Errors from the pager.
#[derive(Debug, thiserror::Error)]
pub enum PagerError {
    /// The per-field line limit must be positive.
    #[error("expected a number greater than 0, but was {0}")]
    InvalidLineLimit(usize),
}

/// One titled block of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Field title.
    pub title: String,
    /// Field body.
    pub body: String,
}

impl Segment {
    /// Segment with both parts cut to their ceilings.
    pub fn new(title: impl AsRef<str>, body: impl AsRef<str>) -> Self {
        Self {
            title: truncate_chars(title.as_ref(), MAX_FIELD_TITLE_LENGTH),
            body: truncate_chars(body.as_ref(), MAX_FIELD_LENGTH),
        }
    }
}

/// Segments that fit in one message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageUnit {
    /// At most [`MAX_FIELDS`] segments.
    pub fields: Vec<Segment>,
}

/// Cut `text` to `max` characters, ending with an ellipsis when shortened.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

/// Range label for a segment spanning `first` to `last`.
///
/// Identical lines give their first character; when one line extends the
/// other the label is `first - last`; otherwise it is the common prefix
/// (at most half the title ceiling) plus the first differing character of
/// each side, joined by a hyphen.
pub fn make_title(first: &str, last: &str) -> String {
    if first.is_empty() || last.is_empty() {
        return format!("{first}{last}");
    }
    if first == last {
        return first.chars().take(1).collect();
    }
    if last.starts_with(first) {
        return format!("{first} - {last}");
    }

    let mut prefix = String::new();
    let max_prefix = MAX_FIELD_TITLE_LENGTH / 2;
    for (i, (a, b)) in first.chars().zip(last.chars()).enumerate() {
        if i >= max_prefix {
            break;
        }
        if a != b {
            let left = format!("{prefix}{a}");
            let right = format!("{prefix}{b}");
            return format!("{}-{}", left.trim_end(), right.trim_end());
        }
        prefix.push(a);
    }
    prefix
}

#[derive(Default)]
struct FieldBuffer {
    body: String,
    chars: usize,
    lines: usize,
    first: String,
    last: String,
}

impl FieldBuffer {
    fn push(&mut self, line: &str, line_chars: usize) {
        if self.lines > 0 {
            self.body.push('\n');
            self.chars = self.chars.saturating_add(1);
        } else {
            self.first = line.to_owned();
        }
        self.body.push_str(line);
        self.chars = self.chars.saturating_add(line_chars);
        self.lines = self.lines.saturating_add(1);
        self.last = line.to_owned();
    }

    fn would_overflow(&self, line_chars: usize) -> bool {
        let separator = usize::from(self.lines > 0);
        self.chars
            .saturating_add(separator)
            .saturating_add(line_chars)
            > MAX_FIELD_LENGTH
    }

    fn flush_into(&mut self, out: &mut Vec<Segment>) {
        let buffer = std::mem::take(self);
        if buffer.body.trim().is_empty() {
            return;
        }
        out.push(Segment::new(
            make_title(&buffer.first, &buffer.last),
            buffer.body,
        ));
    }
}

/// Split lines into segments of at most `max_lines_per_field` lines.
///
/// A segment is also closed early when the next line would push its body
/// past [`MAX_FIELD_LENGTH`]. A single line longer than that is truncated
/// and placed in a segment of its own. Empty input yields no segments.
///
/// # Errors
///
/// Returns [`PagerError::InvalidLineLimit`] when `max_lines_per_field` is zero.
pub fn break_in_field_content<I, S>(
    lines: I,
    max_lines_per_field: usize,
) -> Result<Vec<Segment>, PagerError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if max_lines_per_field == 0 {
        return Err(PagerError::InvalidLineLimit(max_lines_per_field));
    }

    let mut segments = Vec::new();
    let mut buffer = FieldBuffer::default();
    for line in lines {
        let line = line.as_ref();
        let line_chars = line.chars().count();

        if line_chars > MAX_FIELD_LENGTH {
            buffer.flush_into(&mut segments);
            let body = truncate_chars(line, MAX_FIELD_LENGTH);
            segments.push(Segment::new(make_title(&body, &body), body));
            continue;
        }
        if buffer.lines >= max_lines_per_field || buffer.would_overflow(line_chars) {
            buffer.flush_into(&mut segments);
        }
        buffer.push(line, line_chars);
    }
    buffer.flush_into(&mut segments);
    Ok(segments)
}

/// Group segments into message units of at most [`MAX_FIELDS`] fields.
pub fn fold_into_units<I>(segments: I) -> Vec<MessageUnit>
where
    I: IntoIterator<Item = Segment>,
{
    let mut units = Vec::new();
    let mut current = MessageUnit::default();
    for segment in segments {
        if current.fields.len() == MAX_FIELDS {
            units.push(std::mem::take(&mut current));
        }
        current.fields.push(segment);
    }
    if !current.fields.is_empty() {
        units.push(current);
    }
    units
}

/// Split lines into segments with upper-cased titles and fold them into units.
///
/// # Errors
///
/// Returns [`PagerError::InvalidLineLimit`] when `max_lines_per_field` is zero.
pub fn break_in_units<I, S>(
    lines: I,
    max_lines_per_field: usize,
) -> Result<Vec<MessageUnit>, PagerError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let segments = break_in_field_content(lines, max_lines_per_field)?;
    Ok(fold_into_units(segments.into_iter().map(|s| Segment {
        title: truncate_chars(&s.title.to_uppercase(), MAX_FIELD_TITLE_LENGTH),
        body: s.body,
    })))
}
