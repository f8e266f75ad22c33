//! Spine structure analysis: tokenisation, spine evolution across
//! manipulator rows, token graph linking, and track assignment.

use crate::error::ScoreError;
use crate::line::LineKind;
use crate::score::Score;
use crate::token::TokenId;
use std::collections::HashMap;

impl Score {
    /// Split every spined line into tokens and refine the kinds that depend
    /// on cell contents (manipulator rows, all-null data rows).
    pub(crate) fn tokenize_lines(&mut self) {
        for i in 0..self.lines.len() {
            if !self.lines[i].has_spines() {
                continue;
            }
            let text = self.lines[i].text().to_string();
            for (field, cell) in text.split('\t').enumerate() {
                let id = self.new_token(cell, i, field);
                self.lines[i].push_token(id);
            }
            self.refine_kind(i);
        }
    }

    fn refine_kind(&mut self, i: usize) {
        let kind = match self.lines[i].kind() {
            LineKind::Interpretation | LineKind::Exclusive => {
                let mut exclusive = false;
                let mut manipulator = false;
                for id in self.lines[i].token_ids() {
                    let t = self.tok(*id);
                    if t.is_exclusive() {
                        exclusive = true;
                    } else if t.is_manipulator() {
                        manipulator = true;
                    }
                }
                if exclusive {
                    LineKind::Exclusive
                } else if manipulator {
                    LineKind::Manipulator
                } else {
                    LineKind::Interpretation
                }
            }
            LineKind::Data => {
                let all_null = self
                    .lines[i]
                    .token_ids()
                    .iter()
                    .all(|id| self.tok(*id).text() == ".");
                if all_null {
                    LineKind::NullData
                } else {
                    LineKind::Data
                }
            }
            other => other,
        };
        self.lines[i].set_kind(kind);
    }

    /// Maintain the running data-type and spine-label vectors across spined
    /// lines, resolving manipulator rows into the labels of the following
    /// line and registering track starts.
    pub(crate) fn analyze_spines(&mut self) -> Result<(), ScoreError> {
        let mut data_type: Vec<String> = Vec::new();
        let mut spine_info: Vec<String> = Vec::new();
        let mut next_track: u32 = 0;
        let mut seen_spined = false;
        for i in 0..self.lines.len() {
            if !self.lines[i].has_spines() {
                continue;
            }
            let ids: Vec<TokenId> = self.lines[i].token_ids().to_vec();
            if !seen_spined {
                seen_spined = true;
                let all_exclusive = self.lines[i].is_exclusive()
                    && ids.iter().all(|id| self.tok(*id).is_exclusive());
                if !all_exclusive {
                    return Err(ScoreError::MissingExclusive { line: i + 1 });
                }
                for (f, id) in ids.iter().enumerate() {
                    let label = (f + 1).to_string();
                    let text = self.tok(*id).text().to_string();
                    data_type.push(text.clone());
                    spine_info.push(label.clone());
                    let t = self.tok_mut(*id);
                    t.set_spine_info(label);
                    t.set_exclusive(text);
                    self.register_track_start(*id);
                }
                next_track = ids.len() as u32;
                continue;
            }
            if ids.len() != spine_info.len() {
                return Err(ScoreError::SpineCount {
                    line: i + 1,
                    expected: spine_info.len(),
                    found: ids.len(),
                });
            }
            for (f, id) in ids.iter().enumerate() {
                let exclusive = if self.tok(*id).is_exclusive() {
                    self.tok(*id).text().to_string()
                } else {
                    if data_type[f].is_empty() {
                        // A spine added with *+ must declare its data type
                        // before anything else appears in it.
                        return Err(ScoreError::ExpectedExclusive { line: i + 1 });
                    }
                    data_type[f].clone()
                };
                let t = self.tok_mut(*id);
                t.set_spine_info(spine_info[f].clone());
                t.set_exclusive(exclusive);
            }
            if self.lines[i].is_manipulator() {
                (data_type, spine_info) =
                    self.adjust_spines(i, &data_type, &spine_info, &mut next_track)?;
            }
        }
        if !spine_info.is_empty() {
            return Err(ScoreError::UnterminatedSpines);
        }
        Ok(())
    }

    /// Resolve one manipulator row into the data-type and spine-label
    /// vectors for the following line.
    fn adjust_spines(
        &mut self,
        line_idx: usize,
        data_type: &[String],
        spine_info: &[String],
        next_track: &mut u32,
    ) -> Result<(Vec<String>, Vec<String>), ScoreError> {
        let ids: Vec<TokenId> = self.lines[line_idx].token_ids().to_vec();
        let mut new_type: Vec<String> = Vec::new();
        let mut new_info: Vec<String> = Vec::new();
        let mut i = 0;
        while i < ids.len() {
            let text = self.tok(ids[i]).text().to_string();
            match text.as_str() {
                "*^" => {
                    new_type.push(data_type[i].clone());
                    new_type.push(data_type[i].clone());
                    new_info.push(format!("({})a", spine_info[i]));
                    new_info.push(format!("({})b", spine_info[i]));
                    i += 1;
                }
                "*v" => {
                    let mut run = 1;
                    while i + run < ids.len() && self.tok(ids[i + run]).text() == "*v" {
                        run += 1;
                    }
                    if run < 2 {
                        return Err(ScoreError::SingleMerge { line: line_idx + 1 });
                    }
                    new_type.push(data_type[i].clone());
                    new_info.push(merged_spine_info(&spine_info[i..i + run]));
                    i += run;
                }
                "*x" => {
                    if i + 1 >= ids.len() || self.tok(ids[i + 1]).text() != "*x" {
                        return Err(ScoreError::UnmatchedExchange { line: line_idx + 1 });
                    }
                    new_type.push(data_type[i + 1].clone());
                    new_type.push(data_type[i].clone());
                    new_info.push(spine_info[i + 1].clone());
                    new_info.push(spine_info[i].clone());
                    i += 2;
                }
                "*+" => {
                    new_type.push(data_type[i].clone());
                    new_info.push(spine_info[i].clone());
                    *next_track += 1;
                    new_type.push(String::new());
                    new_info.push(next_track.to_string());
                    i += 1;
                }
                "*-" => {
                    i += 1;
                }
                t if t.starts_with("**") => {
                    if !data_type[i].is_empty() {
                        return Err(ScoreError::MisplacedExclusive { line: line_idx + 1 });
                    }
                    new_type.push(text.clone());
                    new_info.push(spine_info[i].clone());
                    self.register_track_start(ids[i]);
                    i += 1;
                }
                _ => {
                    new_type.push(data_type[i].clone());
                    new_info.push(spine_info[i].clone());
                    i += 1;
                }
            }
        }
        Ok((new_type, new_info))
    }

    /// Wire next/prev edges between each pair of consecutive spined lines
    /// according to the manipulators on the earlier of the two.
    pub(crate) fn analyze_links(&mut self) -> Result<(), ScoreError> {
        let mut prev: Option<usize> = None;
        for i in 0..self.lines.len() {
            if !self.lines[i].has_spines() {
                continue;
            }
            if let Some(p) = prev {
                self.stitch_lines(p, i)?;
            }
            prev = Some(i);
        }
        Ok(())
    }

    fn stitch_lines(&mut self, p: usize, n: usize) -> Result<(), ScoreError> {
        let prev_ids: Vec<TokenId> = self.lines[p].token_ids().to_vec();
        let next_ids: Vec<TokenId> = self.lines[n].token_ids().to_vec();
        if !self.lines[p].is_manipulator() {
            if prev_ids.len() != next_ids.len() {
                return Err(ScoreError::LinkMismatch { line: p + 1 });
            }
            for (a, b) in prev_ids.iter().zip(&next_ids) {
                self.link(*a, *b);
            }
            return Ok(());
        }
        let mismatch = || ScoreError::LinkMismatch { line: p + 1 };
        let mut i = 0;
        let mut j = 0;
        while i < prev_ids.len() {
            let text = self.tok(prev_ids[i]).text().to_string();
            match text.as_str() {
                "*^" => {
                    if j + 1 >= next_ids.len() {
                        return Err(mismatch());
                    }
                    self.link(prev_ids[i], next_ids[j]);
                    self.link(prev_ids[i], next_ids[j + 1]);
                    i += 1;
                    j += 2;
                }
                "*v" => {
                    if j >= next_ids.len() {
                        return Err(mismatch());
                    }
                    let mut run = 1;
                    while i + run < prev_ids.len() && self.tok(prev_ids[i + run]).text() == "*v" {
                        run += 1;
                    }
                    for k in 0..run {
                        self.link(prev_ids[i + k], next_ids[j]);
                    }
                    i += run;
                    j += 1;
                }
                "*x" => {
                    if i + 1 >= prev_ids.len() || j + 1 >= next_ids.len() {
                        return Err(mismatch());
                    }
                    self.link(prev_ids[i], next_ids[j + 1]);
                    self.link(prev_ids[i + 1], next_ids[j]);
                    i += 2;
                    j += 2;
                }
                "*+" => {
                    if j + 1 >= next_ids.len() {
                        return Err(mismatch());
                    }
                    self.link(prev_ids[i], next_ids[j]);
                    i += 1;
                    j += 2;
                }
                "*-" => {
                    i += 1;
                }
                _ => {
                    if j >= next_ids.len() {
                        return Err(mismatch());
                    }
                    self.link(prev_ids[i], next_ids[j]);
                    i += 1;
                    j += 1;
                }
            }
        }
        if j != next_ids.len() {
            return Err(mismatch());
        }
        Ok(())
    }

    fn link(&mut self, from: TokenId, to: TokenId) {
        self.tok_mut(from).next.push(to);
        self.tok_mut(to).prev.push(from);
    }

    /// Label every token with the track of the exclusive interpretation its
    /// lineage starts from, then number subtracks left-to-right per line
    /// and collect track terminators.
    pub(crate) fn analyze_tracks(&mut self) {
        for track in 1..=self.max_track() {
            let Some(start) = self.track_start_id(track) else {
                continue;
            };
            let mut stack = vec![start];
            while let Some(id) = stack.pop() {
                if self.tok(id).track() != 0 {
                    continue;
                }
                self.tok_mut(id).set_track(track);
                stack.extend(self.tok(id).next_token_ids().iter().copied());
            }
        }
        for i in 0..self.lines.len() {
            let ids: Vec<TokenId> = self.lines[i].token_ids().to_vec();
            let mut counts: HashMap<u32, u32> = HashMap::new();
            for id in ids {
                let track = self.tok(id).track();
                let count = counts.entry(track).or_insert(0);
                *count += 1;
                let subtrack = *count;
                self.tok_mut(id).set_subtrack(subtrack);
            }
        }
        for idx in 0..self.tokens.len() {
            if self.tokens[idx].is_terminator() {
                let track = self.tokens[idx].track();
                if track > 0 {
                    self.register_track_end(track, TokenId(idx as u32));
                }
            }
        }
    }
}

/// Merged spine label for a run of adjacent `*v` cells: when every member
/// shares the same `(S)x` envelope the merged label is `S`, otherwise the
/// members are joined with commas.
fn merged_spine_info(labels: &[String]) -> String {
    let first = &labels[0];
    let len = first.len();
    let same_envelope = len >= 4
        && first.starts_with('(')
        && first.as_bytes()[len - 2] == b')'
        && labels
            .iter()
            .all(|l| l.len() == len && l[..len - 1] == first[..len - 1]);
    if same_envelope {
        first[1..len - 2].to_string()
    } else {
        labels.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merged_spine_info() {
        assert_eq!(merged_spine_info(&labels(&["(1)a", "(1)b"])), "1");
        assert_eq!(merged_spine_info(&labels(&["((1)a)a", "((1)a)b"])), "(1)a");
        assert_eq!(merged_spine_info(&labels(&["(1)a", "(2)b"])), "(1)a,(2)b");
        assert_eq!(merged_spine_info(&labels(&["1", "2"])), "1,2");
        assert_eq!(
            merged_spine_info(&labels(&["(((1)a)a)a", "((1)a)b"])),
            "(((1)a)a)a,((1)a)b"
        );
    }
}
