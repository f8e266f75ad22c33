use crate::dur::Dur;
use crate::token::TokenId;
use serde::Serialize;

/// Classification of one input row. The kinds form a closed set; spined
/// kinds carry tokens, the others own their text only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineKind {
    Empty,
    GlobalComment,
    /// Reference records start with `!!!` and carry file-level metadata.
    Reference,
    LocalComment,
    /// A spined row containing at least one `**X` token.
    Exclusive,
    /// A spined row containing spine manipulators (`*^ *v *x *+ *-`).
    Manipulator,
    /// Any other spined `*` row, e.g. `*M4/4`.
    Interpretation,
    Barline,
    Data,
    /// A data row whose every cell is the null token `.`.
    NullData,
}

/// One parsed row: the original text, its classification, its tokens when
/// spined, and the rational durations filled in by rhythm analysis.
#[derive(Debug, Clone)]
pub struct Line {
    text: String,
    kind: LineKind,
    tokens: Vec<TokenId>,
    pub(crate) duration: Dur,
    pub(crate) duration_from_start: Dur,
    pub(crate) duration_from_barline: Dur,
    pub(crate) duration_to_barline: Dur,
    parameters: Vec<(String, String)>,
}

impl Line {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = Self::classify(&text);
        Self {
            text,
            kind,
            tokens: Vec::new(),
            duration: Dur::UNDEFINED,
            duration_from_start: Dur::UNDEFINED,
            duration_from_barline: Dur::UNDEFINED,
            duration_to_barline: Dur::UNDEFINED,
            parameters: Vec::new(),
        }
    }

    /// Classify by leading characters. Spined `*` and data rows are refined
    /// once their tokens are known (manipulators, all-null data).
    fn classify(text: &str) -> LineKind {
        if text.is_empty() {
            LineKind::Empty
        } else if text.starts_with("!!!") {
            LineKind::Reference
        } else if text.starts_with("!!") {
            LineKind::GlobalComment
        } else if text.starts_with('!') {
            LineKind::LocalComment
        } else if text.starts_with("**") {
            LineKind::Exclusive
        } else if text.starts_with('*') {
            LineKind::Interpretation
        } else if text.starts_with('=') {
            LineKind::Barline
        } else {
            LineKind::Data
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn set_text(&mut self, text: String) {
        self.text = text;
    }

    pub fn kind(&self) -> LineKind {
        self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: LineKind) {
        self.kind = kind;
    }

    pub fn token_ids(&self) -> &[TokenId] {
        &self.tokens
    }

    pub(crate) fn push_token(&mut self, id: TokenId) {
        self.tokens.push(id);
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Whether this row participates in the spine grid.
    pub fn has_spines(&self) -> bool {
        !matches!(
            self.kind,
            LineKind::Empty | LineKind::GlobalComment | LineKind::Reference
        )
    }

    pub fn is_data(&self) -> bool {
        matches!(self.kind, LineKind::Data | LineKind::NullData)
    }

    pub fn is_barline(&self) -> bool {
        self.kind == LineKind::Barline
    }

    pub fn is_local_comment(&self) -> bool {
        self.kind == LineKind::LocalComment
    }

    pub fn is_global_comment(&self) -> bool {
        self.kind == LineKind::GlobalComment
    }

    pub fn is_reference(&self) -> bool {
        self.kind == LineKind::Reference
    }

    /// Rows that change spine topology or declare data types.
    pub fn is_manipulator(&self) -> bool {
        matches!(self.kind, LineKind::Exclusive | LineKind::Manipulator)
    }

    pub fn is_exclusive(&self) -> bool {
        self.kind == LineKind::Exclusive
    }

    /// Duration of this line in quarter notes.
    pub fn duration(&self) -> Dur {
        self.duration
    }

    /// Exact time from the start of the score to this line.
    pub fn duration_from_start(&self) -> Dur {
        self.duration_from_start
    }

    /// Time elapsed since the most recent barline.
    pub fn duration_from_barline(&self) -> Dur {
        self.duration_from_barline
    }

    /// Time remaining until the next barline. For a barline line this is
    /// the duration of the measure starting at it.
    pub fn duration_to_barline(&self) -> Dur {
        self.duration_to_barline
    }

    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn add_parameters(&mut self, params: Vec<(String, String)>) {
        self.parameters.extend(params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(Line::new("").kind(), LineKind::Empty);
        assert_eq!(Line::new("!!!COM: Corelli").kind(), LineKind::Reference);
        assert_eq!(Line::new("!! a comment").kind(), LineKind::GlobalComment);
        assert_eq!(Line::new("! local\t!").kind(), LineKind::LocalComment);
        assert_eq!(Line::new("**kern\t**text").kind(), LineKind::Exclusive);
        assert_eq!(Line::new("*M4/4\t*").kind(), LineKind::Interpretation);
        assert_eq!(Line::new("=1\t=1").kind(), LineKind::Barline);
        assert_eq!(Line::new("4c\tfoo").kind(), LineKind::Data);
    }

    #[test]
    fn test_spined() {
        assert!(!Line::new("!! global").has_spines());
        assert!(!Line::new("").has_spines());
        assert!(!Line::new("!!!OTL: title").has_spines());
        assert!(Line::new("! local").has_spines());
        assert!(Line::new("4c").has_spines());
        assert!(Line::new("=2").has_spines());
    }
}
