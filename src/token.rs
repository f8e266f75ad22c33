use crate::dur::Dur;
use crate::recip;

/// Index of a token in the owning score's arena. All graph edges between
/// tokens are arena indices, so the token graph has no ownership cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenId(pub(crate) u32);

/// One cell of the Humdrum grid: its text plus the identity and graph
/// links derived by analysis.
#[derive(Debug, Clone)]
pub struct Token {
    text: String,
    line: usize,
    field: usize,
    /// Exclusive interpretation governing this token, e.g. `**kern`.
    exclusive: String,
    /// Lineage label, e.g. `1`, `(1)a`, `((1)a)b`.
    spine_info: String,
    /// Primary spine index, 1-based; 0 until tracks are assigned.
    track: u32,
    /// 1-based position among same-track tokens on the owning line.
    subtrack: u32,
    duration: Dur,
    /// Visit counter used to deduplicate traversal during rhythm analysis.
    pub(crate) visit: u32,
    pub(crate) next: Vec<TokenId>,
    pub(crate) prev: Vec<TokenId>,
    parameters: Vec<(String, String)>,
}

impl Token {
    pub(crate) fn new(text: impl Into<String>, line: usize, field: usize) -> Self {
        Self {
            text: text.into(),
            line,
            field,
            exclusive: String::new(),
            spine_info: String::new(),
            track: 0,
            subtrack: 0,
            duration: Dur::UNDEFINED,
            visit: 0,
            next: Vec::new(),
            prev: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn set_text(&mut self, text: String) {
        self.text = text;
    }

    pub fn line_index(&self) -> usize {
        self.line
    }

    pub fn field_index(&self) -> usize {
        self.field
    }

    pub fn exclusive(&self) -> &str {
        &self.exclusive
    }

    pub(crate) fn set_exclusive(&mut self, exclusive: impl Into<String>) {
        self.exclusive = exclusive.into();
    }

    pub fn spine_info(&self) -> &str {
        &self.spine_info
    }

    pub(crate) fn set_spine_info(&mut self, info: impl Into<String>) {
        self.spine_info = info.into();
    }

    pub fn track(&self) -> u32 {
        self.track
    }

    pub(crate) fn set_track(&mut self, track: u32) {
        self.track = track;
    }

    pub fn subtrack(&self) -> u32 {
        self.subtrack
    }

    pub(crate) fn set_subtrack(&mut self, subtrack: u32) {
        self.subtrack = subtrack;
    }

    /// Intrinsic duration in quarter notes. Positive only for data tokens
    /// in rhythmic spines; zero for grace notes; undefined otherwise.
    pub fn duration(&self) -> Dur {
        self.duration
    }

    pub(crate) fn set_duration(&mut self, duration: Dur) {
        self.duration = duration;
    }

    /// Tokens on the next spined line that continue this sub-stream.
    pub fn next_token_ids(&self) -> &[TokenId] {
        &self.next
    }

    pub fn prev_token_ids(&self) -> &[TokenId] {
        &self.prev
    }

    /// Key/value pairs attached from preceding layout comments.
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

    /// Null tokens are placeholders: null data `.`, null interpretation
    /// `*`, or null comment `!`.
    pub fn is_null(&self) -> bool {
        matches!(self.text.as_str(), "." | "*" | "!")
    }

    pub fn is_comment(&self) -> bool {
        self.text.starts_with('!')
    }

    pub fn is_interpretation(&self) -> bool {
        self.text.starts_with('*')
    }

    pub fn is_exclusive(&self) -> bool {
        self.text.starts_with("**")
    }

    pub fn is_split(&self) -> bool {
        self.text == "*^"
    }

    pub fn is_merge(&self) -> bool {
        self.text == "*v"
    }

    pub fn is_exchange(&self) -> bool {
        self.text == "*x"
    }

    pub fn is_add(&self) -> bool {
        self.text == "*+"
    }

    pub fn is_terminator(&self) -> bool {
        self.text == "*-"
    }

    /// Manipulators control spine topology; exclusive interpretations count
    /// because they (re)declare a spine's data type.
    pub fn is_manipulator(&self) -> bool {
        self.is_exclusive()
            || self.is_split()
            || self.is_merge()
            || self.is_exchange()
            || self.is_add()
            || self.is_terminator()
    }

    pub fn is_barline(&self) -> bool {
        self.text.starts_with('=')
    }

    pub fn is_data(&self) -> bool {
        !self.is_comment() && !self.is_interpretation() && !self.is_barline()
    }

    /// Whether this token's spine carries rhythm.
    pub fn has_rhythm(&self) -> bool {
        recip::is_rhythmic(&self.exclusive)
    }

    pub fn is_rest(&self) -> bool {
        self.has_rhythm() && self.is_data() && self.text.contains('r')
    }

    /// Secondary tied notes continue (`_`) or end (`]`) a tie begun on an
    /// earlier attack.
    pub fn is_secondary_tie(&self) -> bool {
        self.has_rhythm()
            && self.is_data()
            && (self.text.contains('_') || self.text.contains(']'))
    }
}
