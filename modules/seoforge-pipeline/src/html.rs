//! Minimal view of an article as text runs and h1/h2 elements.
//!
//! Only headings are addressable. Everything between them is kept as the
//! exact source text, so swapping a heading and swapping it back yields the
//! original bytes.

use std::sync::LazyLock;

use regex::Regex;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h1(?:\s[^>]*)?>.*?</h1\s*>|<h2(?:\s[^>]*)?>.*?</h2\s*>").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    H1,
    H2,
}

/// A complete heading element, opening tag to closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: HeadingLevel,
    pub markup: String,
}

impl Heading {
    fn from_markup(markup: &str) -> Self {
        let level = match markup.as_bytes().get(2) {
            Some(b'1') => HeadingLevel::H1,
            _ => HeadingLevel::H2,
        };
        Self {
            level,
            markup: markup.to_string(),
        }
    }
}

/// All h1/h2 elements in document order.
pub fn extract_headings(html: &str) -> Vec<Heading> {
    HEADING_RE
        .find_iter(html)
        .map(|m| Heading::from_markup(m.as_str()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Heading(Heading),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingDocument {
    segments: Vec<Segment>,
    /// Segment index of each heading, in document order.
    slots: Vec<usize>,
}

impl HeadingDocument {
    pub fn parse(html: &str) -> Self {
        let mut segments = Vec::new();
        let mut slots = Vec::new();
        let mut cursor = 0;

        for m in HEADING_RE.find_iter(html) {
            if m.start() > cursor {
                segments.push(Segment::Text(html[cursor..m.start()].to_string()));
            }
            slots.push(segments.len());
            segments.push(Segment::Heading(Heading::from_markup(m.as_str())));
            cursor = m.end();
        }
        if cursor < html.len() {
            segments.push(Segment::Text(html[cursor..].to_string()));
        }

        Self { segments, slots }
    }

    pub fn heading_count(&self) -> usize {
        self.slots.len()
    }

    pub fn heading(&self, index: usize) -> Option<&Heading> {
        match self.segments.get(*self.slots.get(index)?) {
            Some(Segment::Heading(h)) => Some(h),
            _ => None,
        }
    }

    /// Swap the heading at `index`, returning the one it replaced.
    pub fn replace(&mut self, index: usize, heading: Heading) -> Option<Heading> {
        let slot = *self.slots.get(index)?;
        match std::mem::replace(&mut self.segments[slot], Segment::Heading(heading)) {
            Segment::Heading(previous) => Some(previous),
            Segment::Text(_) => None,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Heading(h) => out.push_str(&h.markup),
            }
        }
        out
    }
}
