//! Parser and structural analyzer for scores in the Humdrum format.
//!
//! Humdrum is a column-oriented, tab-delimited representation of symbolic
//! music: each column is a *spine* (a time-ordered stream of tokens) and
//! rows are time-coincident events across spines. Spines split, merge,
//! exchange, add, and terminate between rows, so parsing builds a graph of
//! per-token next/previous links rather than fixed columns.
//!
//! [`Score::parse`] tokenises the input, resolves the spine graph, and runs
//! rhythm analysis: every line receives an exact rational
//! duration-from-start and duration, barlines are indexed (with a pickup
//! sentinel when data precedes the first barline), and a ticks-per-quarter
//! normaliser is derived. Filtered per-track token sequences are available
//! through [`Score::track_sequence`] and friends.
//!
//! ```
//! use humdrum::{Dur, Score, SpineFilter};
//!
//! let score = Score::parse("**kern\n4c\n4d\n*-\n").unwrap();
//! assert_eq!(score.score_duration(), Dur::from_int(2));
//! let filter = SpineFilter {
//!     no_interp: true,
//!     ..SpineFilter::attacks()
//! };
//! let notes = score.primary_track_sequence(1, filter);
//! assert_eq!(notes.len(), 2);
//! ```

pub mod csv;
pub mod dur;
pub mod error;
pub mod line;
pub mod recip;
pub mod score;
pub mod token;

pub use dur::Dur;
pub use error::ScoreError;
pub use line::{Line, LineKind};
pub use score::{LineDump, Score, SpineDump, SpineFilter};
pub use token::{Token, TokenId};
