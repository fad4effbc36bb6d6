use crate::models::chat::Annotation;
use log::warn;

/// What a citation marker shows and which document it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub display: String,
    pub file_name: Option<String>,
}

impl Citation {
    fn from_annotation(annotation: &Annotation) -> Self {
        let display = match &annotation.file_name {
            Some(name) => format!("[{}]", name),
            None => annotation.text.clone(),
        };
        Self {
            display,
            file_name: annotation.file_name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct Span {
    start: usize,
    end: usize,
    citation: Citation,
}

/// Completed message content together with its resolved citation spans.
///
/// The base string is never modified; `materialize` produces the substituted
/// text in one forward pass, so no span's offsets depend on another span's
/// replacement.
#[derive(Debug, Clone)]
pub struct CitedContent {
    base: String,
    spans: Vec<Span>,
}

impl CitedContent {
    /// Resolves annotation offsets (in chars) against `content`. Inverted,
    /// out-of-range and overlapping annotations are dropped.
    pub fn resolve(content: impl Into<String>, annotations: &[Annotation]) -> Self {
        let base = content.into();
        let mut boundaries: Vec<usize> = base
            .char_indices()
            .map(|(i, _)| i)
            .collect();
        boundaries.push(base.len());
        let char_count = boundaries.len() - 1;

        let mut candidates: Vec<(usize, usize, &Annotation)> = Vec::with_capacity(
            annotations.len()
        );
        for annotation in annotations {
            if annotation.start_index > annotation.end_index || annotation.end_index > char_count {
                warn!(
                    "Dropping citation {:?} with range {}..{} outside content of {} chars",
                    annotation.text,
                    annotation.start_index,
                    annotation.end_index,
                    char_count
                );
                continue;
            }
            candidates.push((annotation.start_index, annotation.end_index, annotation));
        }
        candidates.sort_by_key(|(start, _, _)| *start);

        let mut spans: Vec<Span> = Vec::with_capacity(candidates.len());
        let mut covered_until = 0;
        for (start, end, annotation) in candidates {
            if !spans.is_empty() && start < covered_until {
                warn!(
                    "Dropping citation {:?} overlapping previous span ending at {}",
                    annotation.text,
                    covered_until
                );
                continue;
            }
            covered_until = end;
            // byte offsets from here on
            spans.push(Span {
                start: boundaries[start],
                end: boundaries[end],
                citation: Citation::from_annotation(annotation),
            });
        }

        Self { base, spans }
    }

    pub fn citations(&self) -> impl Iterator<Item = &Citation> {
        self.spans.iter().map(|s| &s.citation)
    }

    /// Distinct document names in order of first citation.
    pub fn references(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for name in self.citations().filter_map(|c| c.file_name.as_deref()) {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }

    /// Builds the substituted text, asking `marker` for each citation's markup.
    pub fn materialize<F>(&self, mut marker: F) -> String where F: FnMut(&Citation) -> String {
        let mut out = String::with_capacity(self.base.len());
        let mut cursor = 0;
        for span in &self.spans {
            out.push_str(&self.base[cursor..span.start]);
            out.push_str(&marker(&span.citation));
            cursor = span.end;
        }
        out.push_str(&self.base[cursor..]);
        out
    }

    /// Plain-text rendering: each span replaced by its display text.
    pub fn render_plain(&self) -> String {
        self.materialize(|c| c.display.clone())
    }
}
