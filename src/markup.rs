//! Markup embedded in generated text.
//!
//! Two conventions: positional image placeholders `[IMAGE_k]` (1-indexed) in notes bodies,
//! and `[TABLE]...[/TABLE]` blocks in explanations and solutions. Both parse leniently;
//! anything that does not resolve stays as plain text.

use crate::provider::AssetRef;
use once_cell::sync::Lazy;
use regex::Regex;

const PLACEHOLDER_PATTERN: &str = r"\[IMAGE_(\d+)\]";

static PLACEHOLDER_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(PLACEHOLDER_PATTERN).ok());
const TABLE_OPEN: &str = "[TABLE]";
const TABLE_CLOSE: &str = "[/TABLE]";

/// Piece of a notes body after placeholder resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(String),
    /// Resolved marker; `number` is the 1-based index written in the body
    Image { number: usize, asset: &'a AssetRef },
}

/// Split `body` on `[IMAGE_k]` markers, resolving each to `images[k-1]`.
///
/// Markers with no matching image (`k == 0` or past the end) are kept verbatim inside
/// the surrounding text. Adjacent text is merged.
pub fn resolve_placeholders<'a>(body: &str, images: &'a [AssetRef]) -> Vec<Segment<'a>> {
    let Some(re) = PLACEHOLDER_RE.as_ref() else {
        return vec![Segment::Text(body.to_string())];
    };

    let mut segments = Vec::new();
    let mut text = String::new();
    let mut cursor = 0;
    for cap in re.captures_iter(body) {
        let Some(marker) = cap.get(0) else {
            continue;
        };
        let asset = cap
            .get(1)
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .filter(|&k| k >= 1)
            .and_then(|k| images.get(k - 1).map(|asset| (k, asset)));

        text.push_str(&body[cursor..marker.start()]);
        match asset {
            Some((number, asset)) => {
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Image { number, asset });
            }
            None => text.push_str(marker.as_str()),
        }
        cursor = marker.end();
    }
    text.push_str(&body[cursor..]);
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}

/// Replace every resolvable marker with `render(number, asset)`.
pub fn substitute_placeholders<F>(body: &str, images: &[AssetRef], render: F) -> String
where
    F: Fn(usize, &AssetRef) -> String,
{
    resolve_placeholders(body, images)
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(text) => text,
            Segment::Image { number, asset } => render(number, asset),
        })
        .collect()
}

/// Parsed `[TABLE]` block; the first row is the header
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn parse(inner: &str) -> Self {
        let mut lines = inner
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.split('|')
                    .map(|cell| cell.trim().to_string())
                    .collect::<Vec<String>>()
            });
        let header = lines.next().unwrap_or_default();
        Table {
            header,
            rows: lines.collect(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Text(String),
    Table(Table),
}

/// Split text into plain runs and `[TABLE]` blocks. An unterminated block is plain text.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find(TABLE_OPEN) {
        let body_start = open + TABLE_OPEN.len();
        let Some(close) = rest[body_start..].find(TABLE_CLOSE) else {
            break;
        };
        if open > 0 {
            blocks.push(Block::Text(rest[..open].to_string()));
        }
        blocks.push(Block::Table(Table::parse(&rest[body_start..body_start + close])));
        rest = &rest[body_start + close + TABLE_CLOSE.len()..];
    }
    if !rest.is_empty() {
        blocks.push(Block::Text(rest.to_string()));
    }
    blocks
}
