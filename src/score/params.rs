//! Layout parameter attachment. Global `!!LO:` comments attach to the next
//! semantically attachable spined line; local `!LO:` comment tokens attach
//! to the next non-null, non-manipulator token in their spine.

use crate::score::Score;
use crate::token::TokenId;

impl Score {
    fn is_all_null(&self, line: usize) -> bool {
        self.lines[line]
            .token_ids()
            .iter()
            .all(|id| self.tok(*id).is_null())
    }

    pub(crate) fn analyze_global_parameters(&mut self) {
        let mut attach: Option<usize> = None;
        for i in (0..self.lines.len()).rev() {
            if self.lines[i].has_spines() {
                if self.is_all_null(i) {
                    continue;
                }
                if self.lines[i].is_manipulator() {
                    continue;
                }
                if self.lines[i].is_local_comment() {
                    continue;
                }
                // A non-null data line, barline, or plain interpretation.
                attach = Some(i);
                continue;
            }
            let Some(target) = attach else {
                continue;
            };
            if !self.lines[i].is_global_comment() {
                continue;
            }
            let Some(params) = layout_parameters(self.lines[i].text(), "!!LO:") else {
                continue;
            };
            self.lines[target].add_parameters(params);
        }
    }

    pub(crate) fn analyze_local_parameters(&mut self) {
        for track in 1..=self.max_track() {
            for end in self.track_end_ids(track) {
                self.process_local_parameters(end, end);
            }
        }
    }

    fn process_local_parameters(&mut self, start: TokenId, mut current: TokenId) {
        let mut token = start;
        loop {
            let prevs: Vec<TokenId> = self.tok(token).prev_token_ids().to_vec();
            if prevs.is_empty() {
                break;
            }
            for &branch in &prevs[1..] {
                self.process_local_parameters(branch, current);
            }
            if self.tok(token).is_comment() {
                let text = self.tok(token).text().to_string();
                if let Some(params) = layout_parameters(&text, "!LO:") {
                    self.tok_mut(current).add_parameters(params);
                }
            } else {
                let t = self.tok(token);
                if !t.is_null() && !t.is_manipulator() {
                    current = token;
                }
            }
            token = prevs[0];
        }
    }
}

/// Parse the colon-separated body after a layout prefix. `key=value`
/// segments become pairs; bare segments get the value `true`.
fn layout_parameters(text: &str, prefix: &str) -> Option<Vec<(String, String)>> {
    let rest = text.strip_prefix(prefix)?;
    Some(
        rest.split(':')
            .map(|segment| match segment.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (segment.to_string(), "true".to_string()),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_parameters() {
        assert_eq!(
            layout_parameters("!LO:N:vis=dot:t=hi", "!LO:"),
            Some(vec![
                ("N".to_string(), "true".to_string()),
                ("vis".to_string(), "dot".to_string()),
                ("t".to_string(), "hi".to_string()),
            ])
        );
        assert_eq!(layout_parameters("! plain comment", "!LO:"), None);
        assert_eq!(
            layout_parameters("!!LO:TX:a=1", "!!LO:"),
            Some(vec![
                ("TX".to_string(), "true".to_string()),
                ("a".to_string(), "1".to_string()),
            ])
        );
    }
}
