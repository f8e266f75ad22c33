//! Duration parsing for rhythm-bearing exclusive interpretations.
//!
//! A rhythm prefix in `**recip` or `**kern` data is an integer `n` denoting
//! `4/n` quarter notes, so `4` is a quarter, `2` a half, and `1` a whole.
//! A run of `k` zeros denotes `4 * 2^k` quarters (`0` breve, `00` long,
//! `000` maxima). `n%m` denotes the ratio `4*m/n`. Each dot after the
//! numeric part adds half of the previously added value. A `q` (or `Q`)
//! anywhere in the token marks a grace note with zero duration. `**koto`
//! rhythms start from a quarter note halved once per `|` flag, with the
//! same dot and grace rules.

use crate::dur::Dur;
use std::collections::HashMap;
use std::sync::LazyLock;
use winnow::Parser;
use winnow::combinator::opt;
use winnow::combinator::preceded;
use winnow::stream::AsChar;
use winnow::token::take_while;

/// Parses the intrinsic duration of one data token, in quarter notes.
/// Returns [`Dur::UNDEFINED`] when the token carries no rhythm.
pub type DurParser = fn(&str) -> Dur;

/// Dispatch table from exclusive interpretation to duration parser. Adding
/// a rhythmic data type means adding an entry here.
static RHYTHMIC: LazyLock<HashMap<&'static str, DurParser>> = LazyLock::new(|| {
    HashMap::from([
        ("**kern", recip_duration as DurParser),
        ("**recip", recip_duration as DurParser),
        ("**koto", koto_duration as DurParser),
    ])
});

/// Whether tokens with this exclusive interpretation carry durations.
pub fn is_rhythmic(exclusive: &str) -> bool {
    RHYTHMIC.contains_key(exclusive)
}

pub fn duration_parser(exclusive: &str) -> Option<DurParser> {
    RHYTHMIC.get(exclusive).copied()
}

/// The numeric body of a recip rhythm: digits, an optional `%` ratio
/// continuation, and trailing augmentation dots.
fn rhythm_body<'s>(
    input: &mut &'s str,
) -> winnow::Result<(&'s str, Option<&'s str>, &'s str)> {
    (
        take_while(1.., AsChar::is_dec_digit),
        opt(preceded('%', take_while(1.., AsChar::is_dec_digit))),
        take_while(0.., '.'),
    )
        .parse_next(input)
}

/// Apply `dots` augmentation dots to `base`: the total is
/// `base * (2^(d+1) - 1) / 2^d`. Returns `None` on overflow or an absurd
/// dot count.
fn augment(base: Dur, dots: usize) -> Option<Dur> {
    if dots == 0 {
        return Some(base);
    }
    if dots > 16 {
        return None;
    }
    let d = dots as u32;
    let factor = Dur::new((1i64 << (d + 1)) - 1, 1i64 << d);
    base.checked_mul(&factor)
}

/// Duration of a `**recip`/`**kern` token. Rests, ties, and other
/// notational decorations are ignored; only the numeric rhythm matters.
pub fn recip_duration(text: &str) -> Dur {
    if text == "." {
        return Dur::UNDEFINED;
    }
    if text.contains('q') || text.contains('Q') {
        return Dur::ZERO;
    }
    let Some(start) = text.find(|c: char| c.is_ascii_digit()) else {
        return Dur::UNDEFINED;
    };
    let mut input = &text[start..];
    let Ok((digits, ratio, dots)) = rhythm_body(&mut input) else {
        return Dur::UNDEFINED;
    };
    let base = if ratio.is_none() && digits.bytes().all(|b| b == b'0') {
        // Zero runs double the whole note once per zero.
        let zeros = digits.len() as u32;
        if zeros > 16 {
            return Dur::UNDEFINED;
        }
        Dur::from_int(4i64 << zeros)
    } else {
        let Ok(n) = digits.parse::<i64>() else {
            return Dur::UNDEFINED;
        };
        if n == 0 {
            return Dur::UNDEFINED;
        }
        let m = match ratio {
            None => 1,
            Some(r) => match r.parse::<i64>() {
                Ok(m) => m,
                Err(_) => return Dur::UNDEFINED,
            },
        };
        match 4i64.checked_mul(m) {
            Some(numer) => Dur::new(numer, n),
            None => return Dur::UNDEFINED,
        }
    };
    augment(base, dots.len()).unwrap_or(Dur::UNDEFINED)
}

/// Duration of a `**koto` token: a quarter note halved once per `|` flag.
pub fn koto_duration(text: &str) -> Dur {
    if text == "." {
        return Dur::UNDEFINED;
    }
    if text.contains('q') || text.contains('Q') {
        return Dur::ZERO;
    }
    let flags = text.bytes().filter(|b| *b == b'|').count() as u32;
    if flags > 16 {
        return Dur::UNDEFINED;
    }
    let dots = text.bytes().filter(|b| *b == b'.').count();
    augment(Dur::new(1, 1i64 << flags), dots).unwrap_or(Dur::UNDEFINED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch() {
        assert!(is_rhythmic("**kern"));
        assert!(is_rhythmic("**recip"));
        assert!(is_rhythmic("**koto"));
        assert!(!is_rhythmic("**text"));
        assert!(duration_parser("**dynam").is_none());
    }

    #[test]
    fn test_recip_basics() {
        assert_eq!(recip_duration("4c"), Dur::from_int(1));
        assert_eq!(recip_duration("2a"), Dur::from_int(2));
        assert_eq!(recip_duration("1c"), Dur::from_int(4));
        assert_eq!(recip_duration("8cc"), Dur::new(1, 2));
        assert_eq!(recip_duration("12d"), Dur::new(1, 3));
        // Rests and decorations do not affect the rhythm.
        assert_eq!(recip_duration("4r"), Dur::from_int(1));
        assert_eq!(recip_duration("[4c"), Dur::from_int(1));
        assert_eq!(recip_duration("8c#J\\"), Dur::new(1, 2));
    }

    #[test]
    fn test_recip_zeros() {
        assert_eq!(recip_duration("0c"), Dur::from_int(8));
        assert_eq!(recip_duration("00c"), Dur::from_int(16));
        assert_eq!(recip_duration("000c"), Dur::from_int(32));
    }

    #[test]
    fn test_recip_dots() {
        assert_eq!(recip_duration("4.c"), Dur::new(3, 2));
        assert_eq!(recip_duration("2.g"), Dur::from_int(3));
        assert_eq!(recip_duration("4..c"), Dur::new(7, 4));
        assert_eq!(recip_duration("8.e"), Dur::new(3, 4));
    }

    #[test]
    fn test_recip_ratio() {
        // 2%3 is two-thirds of a whole-note division: 4 * 3/2 = 6 quarters.
        assert_eq!(recip_duration("2%3c"), Dur::from_int(6));
        assert_eq!(recip_duration("3%2c"), Dur::new(8, 3));
    }

    #[test]
    fn test_recip_grace_and_null() {
        assert_eq!(recip_duration("qc"), Dur::ZERO);
        assert_eq!(recip_duration("4qq"), Dur::ZERO);
        assert_eq!(recip_duration("."), Dur::UNDEFINED);
        assert_eq!(recip_duration("cc"), Dur::UNDEFINED);
        assert_eq!(recip_duration("*"), Dur::UNDEFINED);
    }

    #[test]
    fn test_recip_overlong_number() {
        // Numbers that do not fit in the rational terms are non-durational.
        assert_eq!(recip_duration("99999999999999999999c"), Dur::UNDEFINED);
    }

    #[test]
    fn test_koto() {
        assert_eq!(koto_duration("1"), Dur::from_int(1));
        assert_eq!(koto_duration("|5"), Dur::new(1, 2));
        assert_eq!(koto_duration("||7"), Dur::new(1, 4));
        assert_eq!(koto_duration("|5."), Dur::new(3, 4));
        assert_eq!(koto_duration("q5"), Dur::ZERO);
        assert_eq!(koto_duration("."), Dur::UNDEFINED);
    }
}
