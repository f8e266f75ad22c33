//! Rhythm analysis: token durations, duration-from-start propagation
//! through the spine graph, null-line interpolation, line durations, the
//! barline index, and ticks-per-quarter.

use crate::dur::Dur;
use crate::error::ScoreError;
use crate::recip;
use crate::score::Score;
use crate::token::TokenId;
use num_integer::lcm;
use std::collections::BTreeSet;

impl Score {
    /// Assign intrinsic durations to data tokens in rhythmic spines and
    /// reject lines mixing grace notes with regular notes.
    pub(crate) fn analyze_token_durations(&mut self) -> Result<(), ScoreError> {
        for i in 0..self.lines.len() {
            if !self.lines[i].is_data() {
                continue;
            }
            let ids: Vec<TokenId> = self.lines[i].token_ids().to_vec();
            let mut has_grace = false;
            let mut has_regular = false;
            for id in ids {
                let exclusive = self.tok(id).exclusive().to_string();
                let Some(parser) = recip::duration_parser(&exclusive) else {
                    continue;
                };
                let dur = parser(self.tok(id).text());
                if dur.is_zero() {
                    has_grace = true;
                } else if dur.is_positive() {
                    has_regular = true;
                }
                self.tok_mut(id).set_duration(dur);
            }
            if has_grace && has_regular {
                return Err(ScoreError::GraceAndRegular { line: i + 1 });
            }
        }
        Ok(())
    }

    /// Propagate duration-from-start through every rhythmic track, then
    /// interpolate null lines, fill in unvisited lines, derive line
    /// durations, and build the barline index.
    pub(crate) fn analyze_rhythm(&mut self) -> Result<(), ScoreError> {
        if let Some(first) = self.track_start_id(1) {
            let start_line = self.tok(first).line_index();
            for track in 1..=self.max_track() {
                let Some(start) = self.track_start_id(track) else {
                    continue;
                };
                if !self.tok(start).has_rhythm() {
                    continue;
                }
                if self.tok(start).line_index() == start_line {
                    self.assign_durations_to_track(start, Dur::ZERO)?;
                }
            }
            // Spines that begin after the first line must be anchored to a
            // line whose start time is already known.
            for track in 1..=self.max_track() {
                let Some(start) = self.track_start_id(track) else {
                    continue;
                };
                if !self.tok(start).has_rhythm() {
                    continue;
                }
                if self.tok(start).line_index() > start_line {
                    self.analyze_floating_spine(start)?;
                }
            }
        }
        self.analyze_null_line_rhythms()?;
        self.fill_in_missing_starts();
        self.assign_line_durations()?;
        self.analyze_barlines()?;
        self.compute_ticks_per_quarter();
        Ok(())
    }

    fn assign_durations_to_track(
        &mut self,
        start: TokenId,
        startdur: Dur,
    ) -> Result<(), ScoreError> {
        if !self.tok(start).has_rhythm() {
            return Ok(());
        }
        let state = self.tok(start).visit;
        self.propagate_durations(start, state, startdur)
    }

    /// Walk forward from `start` assigning line start times. The primary
    /// sub-spine is walked iteratively; secondary sub-spines are walked by
    /// recursing from each fork point with the running sum at the fork.
    /// The visit counter keeps diamonds (split then merge) from being
    /// traversed more than once per propagation.
    fn propagate_durations(
        &mut self,
        start: TokenId,
        state: u32,
        startdur: Dur,
    ) -> Result<(), ScoreError> {
        if state != self.tok(start).visit {
            return Ok(());
        }
        let mut token = start;
        let mut dursum = startdur;
        self.tok_mut(token).visit += 1;
        self.set_line_duration_from_start(token, dursum)?;
        dursum = self.advance(dursum, token)?;
        loop {
            let Some(&next) = self.tok(token).next_token_ids().first() else {
                break;
            };
            token = next;
            if state != self.tok(token).visit {
                // Reached a sub-stream already covered by an earlier
                // propagation; the shared suffix is already consistent.
                return Ok(());
            }
            self.tok_mut(token).visit += 1;
            self.set_line_duration_from_start(token, dursum)?;
            dursum = self.advance(dursum, token)?;
        }

        let newstate = state + 1;
        let mut token = start;
        let mut dursum = self.advance(startdur, token)?;
        loop {
            let nexts: Vec<TokenId> = self.tok(token).next_token_ids().to_vec();
            if nexts.is_empty() {
                break;
            }
            for &branch in &nexts[1..] {
                self.propagate_durations(branch, state, dursum)?;
            }
            token = nexts[0];
            if newstate != self.tok(token).visit {
                break;
            }
            dursum = self.advance(dursum, token)?;
        }
        Ok(())
    }

    /// Add the token's duration to the running sum when it is positive.
    fn advance(&self, dursum: Dur, token: TokenId) -> Result<Dur, ScoreError> {
        let dur = self.tok(token).duration();
        if dur.is_positive() {
            dursum.checked_add(&dur).ok_or(ScoreError::Overflow {
                line: self.tok(token).line_index() + 1,
            })
        } else {
            Ok(dursum)
        }
    }

    fn set_line_duration_from_start(
        &mut self,
        token: TokenId,
        dursum: Dur,
    ) -> Result<(), ScoreError> {
        let t = self.tok(token);
        if !t.is_terminator() && t.duration().is_negative() {
            // Tokens without rhythm do not pin their line's start time.
            return Ok(());
        }
        let line = t.line_index();
        let current = self.lines[line].duration_from_start;
        if current.is_negative() {
            self.lines[line].duration_from_start = dursum;
        } else if current != dursum {
            return Err(ScoreError::InconsistentRhythm {
                line: line + 1,
                expected: dursum,
                found: current,
            });
        }
        Ok(())
    }

    /// Anchor a spine that does not begin on the first exclusive line:
    /// walk forward until a line with a known start time, then restart
    /// propagation from the spine start with the derived offset.
    fn analyze_floating_spine(&mut self, start: TokenId) -> Result<(), ScoreError> {
        let mut dursum = Dur::ZERO;
        let mut token = start;
        let mut anchor: Option<Dur> = None;
        loop {
            let line = self.tok(token).line_index();
            if self.lines[line].duration_from_start.is_nonnegative() {
                anchor = Some(self.lines[line].duration_from_start);
                break;
            }
            dursum = self.advance(dursum, token)?;
            let Some(&next) = self.tok(token).next_token_ids().first() else {
                break;
            };
            token = next;
        }
        let Some(anchor) = anchor else {
            return Err(ScoreError::FloatingSpine {
                line: self.tok(start).line_index() + 1,
            });
        };
        let seed = anchor.checked_sub(&dursum).ok_or(ScoreError::Overflow {
            line: self.tok(start).line_index() + 1,
        })?;
        self.assign_durations_to_track(start, seed)
    }

    fn is_all_rhythmic_null(&self, line: usize) -> bool {
        self.lines[line]
            .token_ids()
            .iter()
            .map(|id| self.tok(*id))
            .filter(|t| t.has_rhythm())
            .all(|t| t.is_null())
    }

    /// Split the time between two lines with known start times evenly
    /// across the all-null data lines between them.
    fn analyze_null_line_rhythms(&mut self) -> Result<(), ScoreError> {
        let mut nulls: Vec<usize> = Vec::new();
        let mut previous: Option<usize> = None;
        for i in 0..self.lines.len() {
            if !self.lines[i].has_spines() {
                continue;
            }
            if self.is_all_rhythmic_null(i) {
                if self.lines[i].is_data() {
                    nulls.push(i);
                }
                continue;
            }
            let dur = self.lines[i].duration_from_start;
            if dur.is_negative() {
                if self.lines[i].is_data() {
                    return Err(ScoreError::NegativeStart { line: i + 1 });
                }
                continue;
            }
            if let Some(p) = previous {
                let overflow = |line: usize| ScoreError::Overflow { line: line + 1 };
                let startdur = self.lines[p].duration_from_start;
                let gap = dur.checked_sub(&startdur).ok_or_else(|| overflow(i))?;
                let step = gap
                    .checked_div(&Dur::from_int(nulls.len() as i64 + 1))
                    .ok_or_else(|| overflow(i))?;
                for (j, &n) in nulls.iter().enumerate() {
                    let offset = step
                        .checked_mul(&Dur::from_int(j as i64 + 1))
                        .ok_or_else(|| overflow(n))?;
                    self.lines[n].duration_from_start = startdur
                        .checked_add(&offset)
                        .ok_or_else(|| overflow(n))?;
                }
            }
            previous = Some(i);
            nulls.clear();
        }
        Ok(())
    }

    /// Lines never visited by propagation (comments, manipulator rows,
    /// barlines) copy the start time of the next visited line; a forward
    /// pass then covers trailing lines, seeded from the first known value.
    fn fill_in_missing_starts(&mut self) {
        let mut last = Dur::UNDEFINED;
        for i in (0..self.lines.len()).rev() {
            let dur = self.lines[i].duration_from_start;
            if dur.is_negative() && last.is_nonnegative() {
                self.lines[i].duration_from_start = last;
            }
            if dur.is_nonnegative() {
                last = dur;
            }
        }
        for i in 0..self.lines.len() {
            let dur = self.lines[i].duration_from_start;
            if dur.is_nonnegative() {
                last = dur;
            } else {
                self.lines[i].duration_from_start = last;
            }
        }
    }

    fn assign_line_durations(&mut self) -> Result<(), ScoreError> {
        for i in 0..self.lines.len().saturating_sub(1) {
            let start = self.lines[i].duration_from_start;
            let end = self.lines[i + 1].duration_from_start;
            self.lines[i].duration = end
                .checked_sub(&start)
                .ok_or(ScoreError::Overflow { line: i + 1 })?;
        }
        if let Some(last) = self.lines.last_mut() {
            last.duration = Dur::ZERO;
        }
        Ok(())
    }

    /// Build the barline index and the per-line distances to the
    /// surrounding barlines. Data before any barline makes line 0 the
    /// pickup sentinel.
    fn analyze_barlines(&mut self) -> Result<(), ScoreError> {
        self.barlines.clear();
        let overflow = |line: usize| ScoreError::Overflow { line: line + 1 };
        let mut sum = Dur::ZERO;
        let mut found = false;
        for i in 0..self.lines.len() {
            self.lines[i].duration_from_barline = sum;
            let dur = self.lines[i].duration;
            if dur.is_positive() {
                sum = sum.checked_add(&dur).ok_or_else(|| overflow(i))?;
            }
            if self.lines[i].is_barline() {
                found = true;
                self.barlines.push(i);
                sum = Dur::ZERO;
            }
            if self.lines[i].is_data() && !found {
                self.barlines.push(0);
                found = true;
            }
        }
        let mut sum = Dur::ZERO;
        for i in (0..self.lines.len()).rev() {
            let dur = self.lines[i].duration;
            if dur.is_positive() {
                sum = sum.checked_add(&dur).ok_or_else(|| overflow(i))?;
            }
            self.lines[i].duration_to_barline = sum;
            if self.lines[i].is_barline() {
                sum = Dur::ZERO;
            }
        }
        Ok(())
    }

    /// Least common multiple of the denominators of all distinct positive
    /// line durations; 1 when every duration is integral.
    fn compute_ticks_per_quarter(&mut self) {
        let mut denominators: BTreeSet<i64> = BTreeSet::new();
        for line in &self.lines {
            let dur = line.duration;
            if dur.is_positive() && dur.denom() > 1 {
                denominators.insert(dur.denom());
            }
        }
        self.ticks_per_quarter = denominators.into_iter().fold(1, lcm);
    }

    /// Give non-null data tokens in non-rhythmic spines the time until the
    /// next data token in their spine, walking each spine backward from
    /// its terminators.
    pub(crate) fn analyze_nonrhythmic_durations(&mut self) -> Result<(), ScoreError> {
        for track in 1..=self.max_track() {
            for end in self.track_end_ids(track) {
                if self.tok(end).has_rhythm() {
                    continue;
                }
                self.assign_nonrhythmic_track(end, end)?;
            }
        }
        Ok(())
    }

    fn assign_nonrhythmic_track(
        &mut self,
        end: TokenId,
        mut current: TokenId,
    ) -> Result<(), ScoreError> {
        let mut token = end;
        loop {
            let prevs: Vec<TokenId> = self.tok(token).prev_token_ids().to_vec();
            if prevs.is_empty() {
                break;
            }
            for &branch in &prevs[1..] {
                self.assign_nonrhythmic_track(branch, current)?;
            }
            let t = self.tok(token);
            if t.is_data() && !t.is_null() {
                let line = t.line_index();
                let current_start =
                    self.lines[self.tok(current).line_index()].duration_from_start;
                let token_start = self.lines[line].duration_from_start;
                let dur = current_start
                    .checked_sub(&token_start)
                    .ok_or(ScoreError::Overflow { line: line + 1 })?;
                self.tok_mut(token).set_duration(dur);
                current = token;
            }
            token = prevs[0];
        }
        Ok(())
    }
}
