use crate::csv;
use crate::dur::Dur;
use crate::error::ScoreError;
use crate::line::{Line, LineKind};
use crate::token::{Token, TokenId};
use serde::Serialize;
use std::fmt;
use std::fmt::{Display, Formatter};

mod params;
mod query;
mod rhythm;
mod spine;

pub use query::SpineFilter;

/// A parsed Humdrum score: the owned lines, the token arena they index
/// into, and the structural registries built by analysis. A score is
/// constructed, analyzed, and then queried; a failed read leaves it in an
/// invalid state in which only [`Score::is_valid`], [`Score::parse_error`],
/// and [`Score::clear`] are meaningful.
#[derive(Debug, Default)]
pub struct Score {
    lines: Vec<Line>,
    tokens: Vec<Token>,
    /// First exclusive-interpretation token per primary spine. Index 0 is
    /// reserved, so `track_starts.len() - 1` is the track count.
    track_starts: Vec<Option<TokenId>>,
    /// Terminator tokens per track. A track that splits and never re-merges
    /// ends in several terminators.
    track_ends: Vec<Vec<TokenId>>,
    /// Line indices of barlines, preceded by a pickup sentinel (line 0)
    /// when data occurs before the first barline.
    barlines: Vec<usize>,
    ticks_per_quarter: i64,
    parse_error: Option<ScoreError>,
    quiet: bool,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse tab-separated Humdrum text.
    pub fn parse(src: &str) -> Result<Self, ScoreError> {
        let mut score = Self::new();
        score.read(src)?;
        Ok(score)
    }

    /// Parse CSV-encoded Humdrum text with the given separator.
    pub fn parse_csv(src: &str, separator: char) -> Result<Self, ScoreError> {
        let mut score = Self::new();
        score.read_csv(src, separator)?;
        Ok(score)
    }

    /// Read and fully analyze `src`, replacing any previous contents. On
    /// failure the error is also recorded for [`Score::parse_error`].
    pub fn read(&mut self, src: &str) -> Result<(), ScoreError> {
        self.reset();
        let result = self.read_inner(src, true);
        if let Err(e) = &result {
            self.record_error(e.clone());
        }
        result
    }

    /// Read and analyze the spine structure only, skipping rhythm and
    /// parameter analysis. Durations stay undefined.
    pub fn read_no_rhythm(&mut self, src: &str) -> Result<(), ScoreError> {
        self.reset();
        let result = self.read_inner(src, false);
        if let Err(e) = &result {
            self.record_error(e.clone());
        }
        result
    }

    /// Read CSV-encoded text with the given separator.
    pub fn read_csv(&mut self, src: &str, separator: char) -> Result<(), ScoreError> {
        let converted: Vec<String> = src
            .lines()
            .map(|row| csv::row_to_tsv(row, separator))
            .collect();
        self.read(&converted.join("\n"))
    }

    fn read_inner(&mut self, src: &str, with_structure: bool) -> Result<(), ScoreError> {
        for raw in src.lines() {
            self.lines.push(Line::new(raw));
        }
        self.tokenize_lines();
        self.analyze_spines()?;
        self.analyze_links()?;
        self.analyze_tracks();
        if !with_structure {
            return Ok(());
        }
        self.analyze_global_parameters();
        self.analyze_local_parameters();
        self.analyze_token_durations()?;
        self.analyze_rhythm()?;
        self.analyze_nonrhythmic_durations()?;
        Ok(())
    }

    fn record_error(&mut self, e: ScoreError) {
        if !self.quiet {
            log::error!("{e}");
        }
        self.parse_error = Some(e);
    }

    fn reset(&mut self) {
        let quiet = self.quiet;
        *self = Self::default();
        self.quiet = quiet;
    }

    /// Discard all contents and any recorded error.
    pub fn clear(&mut self) {
        self.reset();
    }

    /// Suppress diagnostic logging for failed reads. Does not change the
    /// success/failure contract.
    pub fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    /// Record a failure from a source-bytes collaborator (file, network,
    /// ...). The score enters the same invalid state as a failed read.
    pub fn record_io_error(&mut self, message: impl Into<String>) -> ScoreError {
        let e = ScoreError::Io(message.into());
        self.record_error(e.clone());
        e
    }

    pub fn is_valid(&self) -> bool {
        self.parse_error.is_none()
    }

    pub fn parse_error(&self) -> Option<&ScoreError> {
        self.parse_error.as_ref()
    }

    /// The recorded error rendered as text; empty iff the score is valid.
    pub fn parse_error_message(&self) -> String {
        self.parse_error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Lines and tokens

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    /// The token at `(line, field)`, if that cell exists.
    pub fn token(&self, line: usize, field: usize) -> Option<&Token> {
        let id = *self.lines.get(line)?.token_ids().get(field)?;
        Some(self.tok(id))
    }

    pub fn token_by_id(&self, id: TokenId) -> &Token {
        self.tok(id)
    }

    pub fn line_tokens(&self, line: usize) -> impl Iterator<Item = &Token> {
        self.lines
            .get(line)
            .map(|l| l.token_ids())
            .unwrap_or_default()
            .iter()
            .map(|id| self.tok(*id))
    }

    /// Tokens on the next spined line continuing the given token's
    /// sub-stream.
    pub fn next_tokens(&self, token: &Token) -> Vec<&Token> {
        token.next_token_ids().iter().map(|id| self.tok(*id)).collect()
    }

    pub fn prev_tokens(&self, token: &Token) -> Vec<&Token> {
        token.prev_token_ids().iter().map(|id| self.tok(*id)).collect()
    }

    pub(crate) fn tok(&self, id: TokenId) -> &Token {
        &self.tokens[id.0 as usize]
    }

    pub(crate) fn tok_mut(&mut self, id: TokenId) -> &mut Token {
        &mut self.tokens[id.0 as usize]
    }

    pub(crate) fn new_token(&mut self, text: &str, line: usize, field: usize) -> TokenId {
        let id = TokenId(self.tokens.len() as u32);
        self.tokens.push(Token::new(text, line, field));
        id
    }

    /// Replace the text of the token at `(line, field)`. Classification and
    /// analysis results are untouched; call
    /// [`Score::rebuild_lines_from_tokens`] to make emission reflect the
    /// change.
    pub fn set_token_text(&mut self, line: usize, field: usize, text: impl Into<String>) -> bool {
        let Some(&id) = self.lines.get(line).and_then(|l| l.token_ids().get(field)) else {
            return false;
        };
        self.tok_mut(id).set_text(text.into());
        true
    }

    /// Reference records (`!!!key: value` lines) in file order.
    pub fn reference_records(&self) -> Vec<&Line> {
        self.lines.iter().filter(|l| l.is_reference()).collect()
    }

    // ------------------------------------------------------------------
    // Tracks

    /// Number of primary spines.
    pub fn max_track(&self) -> u32 {
        self.track_starts.len().saturating_sub(1) as u32
    }

    /// The first exclusive-interpretation token of the given track
    /// (1-based).
    pub fn track_start(&self, track: u32) -> Option<&Token> {
        let id = (*self.track_starts.get(track as usize)?)?;
        Some(self.tok(id))
    }

    /// All track starts in track order.
    pub fn spine_starts(&self) -> Vec<&Token> {
        (1..=self.max_track())
            .filter_map(|t| self.track_start(t))
            .collect()
    }

    /// Track starts whose exclusive interpretation matches `exclusive`.
    pub fn spine_starts_with(&self, exclusive: &str) -> Vec<&Token> {
        self.spine_starts()
            .into_iter()
            .filter(|t| t.text() == exclusive)
            .collect()
    }

    pub fn track_end_count(&self, track: u32) -> usize {
        self.track_ends
            .get(track as usize)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    pub fn track_end(&self, track: u32, index: usize) -> Option<&Token> {
        let id = *self.track_ends.get(track as usize)?.get(index)?;
        Some(self.tok(id))
    }

    pub(crate) fn track_end_ids(&self, track: u32) -> Vec<TokenId> {
        self.track_ends
            .get(track as usize)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn track_start_id(&self, track: u32) -> Option<TokenId> {
        *self.track_starts.get(track as usize)?
    }

    pub(crate) fn register_track_start(&mut self, id: TokenId) {
        if self.track_starts.is_empty() {
            self.track_starts.push(None);
        }
        self.track_starts.push(Some(id));
    }

    pub(crate) fn register_track_end(&mut self, track: u32, id: TokenId) {
        let track = track as usize;
        if self.track_ends.len() <= track {
            self.track_ends.resize(track + 1, Vec::new());
        }
        self.track_ends[track].push(id);
    }

    // ------------------------------------------------------------------
    // Durations and barlines

    /// Total duration of the score in quarter notes. Undefined when no
    /// rhythm analysis has run over rhythmic spines.
    pub fn score_duration(&self) -> Dur {
        match self.lines.last() {
            Some(line) => line.duration_from_start(),
            None => Dur::ZERO,
        }
    }

    /// The least positive integer that makes every line duration integral.
    pub fn ticks_per_quarter(&self) -> i64 {
        self.ticks_per_quarter
    }

    /// Number of barlines, counting the pickup sentinel if present.
    pub fn barline_count(&self) -> usize {
        self.barlines.len()
    }

    fn barline_line_index(&self, index: isize) -> Option<usize> {
        let n = self.barlines.len() as isize;
        let i = if index < 0 { index + n } else { index };
        if (0..n).contains(&i) {
            Some(i as usize)
        } else {
            None
        }
    }

    /// The barline at `index`; negative indices count from the end. For a
    /// pickup measure the first entry is the start of the file, not an
    /// actual barline.
    pub fn barline(&self, index: isize) -> Option<&Line> {
        let i = self.barline_line_index(index)?;
        Some(&self.lines[self.barlines[i]])
    }

    /// Duration from this barline to the next, or to the end of the score
    /// for the final barline.
    pub fn barline_duration(&self, index: isize) -> Dur {
        let Some(i) = self.barline_line_index(index) else {
            return Dur::ZERO;
        };
        let start = self.lines[self.barlines[i]].duration_from_start();
        let end = if i + 1 < self.barlines.len() {
            self.lines[self.barlines[i + 1]].duration_from_start()
        } else {
            self.score_duration()
        };
        end - start
    }

    /// Duration from the start of the score to the given barline.
    pub fn barline_duration_from_start(&self, index: isize) -> Dur {
        if index >= self.barlines.len() as isize {
            return self.score_duration();
        }
        match self.barline_line_index(index) {
            Some(i) => self.lines[self.barlines[i]].duration_from_start(),
            None => Dur::ZERO,
        }
    }

    /// Duration from the given barline to the end of the score.
    pub fn barline_duration_to_end(&self, index: isize) -> Dur {
        match self.barline_line_index(index) {
            Some(i) => {
                self.score_duration() - self.lines[self.barlines[i]].duration_from_start()
            }
            None => Dur::ZERO,
        }
    }

    // ------------------------------------------------------------------
    // Emission

    /// Rebuild each spined line's text from its token texts. Call after
    /// editing token text in place so that emission reflects the change.
    pub fn rebuild_lines_from_tokens(&mut self) {
        for i in 0..self.lines.len() {
            if !self.lines[i].has_spines() {
                continue;
            }
            let text = self.lines[i]
                .token_ids()
                .iter()
                .map(|id| self.tok(*id).text())
                .collect::<Vec<_>>()
                .join("\t");
            self.lines[i].set_text(text);
        }
    }

    /// Emit the score in CSV form with the given separator.
    pub fn to_csv(&self, separator: char) -> String {
        let mut out = String::new();
        for line in &self.lines {
            if line.has_spines() {
                let row = line
                    .token_ids()
                    .iter()
                    .map(|id| csv::field_to_csv(self.tok(*id).text(), separator))
                    .collect::<Vec<_>>()
                    .join(&separator.to_string());
                out.push_str(&row);
            } else {
                out.push_str(line.text());
            }
            out.push('\n');
        }
        out
    }

    /// Per-line structural summary for debugging, keyed by line index.
    pub fn structure_dump(&self) -> Vec<LineDump> {
        self.lines
            .iter()
            .enumerate()
            .map(|(index, line)| LineDump {
                index,
                kind: line.kind(),
                duration: line.duration(),
                duration_from_start: line.duration_from_start(),
                spines: line
                    .token_ids()
                    .iter()
                    .map(|id| {
                        let t = self.tok(*id);
                        SpineDump {
                            field: t.field_index(),
                            spine: t.spine_info().to_string(),
                            track: t.track(),
                            subtrack: t.subtrack(),
                            exclusive: t.exclusive().to_string(),
                        }
                    })
                    .collect(),
            })
            .collect()
    }
}

impl Display for Score {
    /// Re-emits the file textually; every token keeps its text verbatim.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line.text())?;
        }
        Ok(())
    }
}

/// One row of [`Score::structure_dump`].
#[derive(Debug, Serialize)]
pub struct LineDump {
    pub index: usize,
    pub kind: LineKind,
    pub duration: Dur,
    pub duration_from_start: Dur,
    pub spines: Vec<SpineDump>,
}

#[derive(Debug, Serialize)]
pub struct SpineDump {
    pub field: usize,
    pub spine: String,
    pub track: u32,
    pub subtrack: u32,
    pub exclusive: String,
}
