//! Filtered extraction of token sequences per track.

use crate::score::Score;
use crate::token::Token;

/// Orthogonal toggles controlling which tokens a track sequence yields.
/// All flags default to off (keep everything).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpineFilter {
    /// Restrict to the left-most sub-spine of the track.
    pub primary: bool,
    /// Omit rows where every selected sub-spine holds a null token.
    pub no_empty: bool,
    /// Omit null tokens individually.
    pub no_null: bool,
    /// Omit interpretation tokens.
    pub no_interp: bool,
    /// Omit spine manipulators, but keep exclusive interpretations and
    /// spine terminators.
    pub no_manip: bool,
    /// Omit comment tokens.
    pub no_comment: bool,
    /// Omit lines without spines. Unspined lines own no tokens in this
    /// model, so setting this cannot change what a sequence yields; the
    /// flag is honored all the same and belongs to the [`SpineFilter::data`]
    /// and [`SpineFilter::attacks`] compounds.
    pub no_global: bool,
    /// Omit rests (rhythmic spines only).
    pub no_rest: bool,
    /// Omit secondary tied notes (rhythmic spines only).
    pub no_tie: bool,
}

impl SpineFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data tokens only, barlines included:
    /// `no_manip | no_comment | no_global`.
    pub fn data() -> Self {
        Self {
            no_manip: true,
            no_comment: true,
            no_global: true,
            ..Self::default()
        }
    }

    /// Note attacks only: `data | no_rest | no_tie | no_null`.
    pub fn attacks() -> Self {
        Self {
            no_rest: true,
            no_tie: true,
            no_null: true,
            ..Self::data()
        }
    }

    fn keep(&self, token: &Token) -> bool {
        if self.no_null && token.is_null() {
            return false;
        }
        if self.no_interp && token.is_interpretation() {
            return false;
        }
        if self.no_manip
            && token.is_manipulator()
            && !token.is_exclusive()
            && !token.is_terminator()
        {
            return false;
        }
        if self.no_comment && token.is_comment() {
            return false;
        }
        if self.no_rest && token.is_rest() {
            return false;
        }
        if self.no_tie && token.is_secondary_tie() {
            return false;
        }
        true
    }
}

impl Score {
    fn line_selection(&self, index: usize, track: u32, filter: SpineFilter) -> Vec<&Token> {
        let line = &self.lines[index];
        // Unspined lines own no tokens, so dropping them here selects the
        // same tokens as the unfiltered path; a test pins the equivalence.
        if filter.no_global && !line.has_spines() {
            return Vec::new();
        }
        let mut row: Vec<&Token> = line
            .token_ids()
            .iter()
            .map(|id| self.tok(*id))
            .filter(|t| t.track() == track)
            .collect();
        if filter.primary {
            row.truncate(1);
        }
        if filter.no_empty && !row.is_empty() && row.iter().all(|t| t.is_null()) {
            row.clear();
        }
        row.retain(|t| filter.keep(t));
        row
    }

    /// Filtered tokens of a track, one row per line that contributes at
    /// least one token after filtering.
    pub fn track_sequence(&self, track: u32, filter: SpineFilter) -> Vec<Vec<&Token>> {
        (0..self.lines.len())
            .map(|i| self.line_selection(i, track, filter))
            .filter(|row| !row.is_empty())
            .collect()
    }

    /// The left-most sub-spine of a track as a flat sequence.
    pub fn primary_track_sequence(&self, track: u32, filter: SpineFilter) -> Vec<&Token> {
        let filter = SpineFilter {
            primary: true,
            ..filter
        };
        self.track_tokens(track, filter).collect()
    }

    /// Lazy flattened iterator over a track's filtered tokens.
    pub fn track_tokens(
        &self,
        track: u32,
        filter: SpineFilter,
    ) -> impl Iterator<Item = &Token> {
        (0..self.lines.len()).flat_map(move |i| self.line_selection(i, track, filter))
    }
}
