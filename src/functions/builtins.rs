//! The baseline functions exposed by every server.

use icu_collator::Collator;
use icu_collator::options::CollatorOptions;
use serde_json::Value;

use super::{CallError, ParamSpec, ParamType, RegisteredFunction};

pub(super) fn all() -> Vec<RegisteredFunction> {
    vec![
        RegisteredFunction::new(
            "floor",
            "Round x down to the nearest integer",
            vec![ParamSpec::new("x", ParamType::Real)],
            |args| floor(args.real(0)?).map(Value::from),
        ),
        RegisteredFunction::new(
            "nroot",
            "Compute the real n-th root of x (n=2 is the square root)",
            vec![
                ParamSpec::new("x", ParamType::Real),
                ParamSpec::new("n", ParamType::Integer),
            ],
            |args| nroot(args.real(0)?, args.integer(1)?).map(Value::from),
        ),
        RegisteredFunction::new(
            "reverse",
            "Reverse a string",
            vec![ParamSpec::new("s", ParamType::Text)],
            |args| Ok(Value::from(reverse(args.text(0)?))),
        ),
        RegisteredFunction::new(
            "validAnagram",
            "Check whether two strings are anagrams of each other",
            vec![
                ParamSpec::new("a", ParamType::Text),
                ParamSpec::new("b", ParamType::Text),
            ],
            |args| Ok(Value::from(valid_anagram(args.text(0)?, args.text(1)?))),
        ),
        RegisteredFunction::new(
            "sort",
            "Sort a list of words in ascending order (latin letters and hiragana)",
            vec![ParamSpec::new("items", ParamType::TextList)],
            |args| sort(args.text_list(0)?).map(Value::from),
        ),
    ]
}

pub fn floor(x: f64) -> Result<i64, CallError> {
    if !x.is_finite() {
        return Err(CallError::Domain(format!("cannot floor non-finite value {x}")));
    }
    let floored = x.floor();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    if floored < i64::MIN as f64 || floored >= i64::MAX as f64 {
        return Err(CallError::Domain(format!("floor({x}) is out of integer range")));
    }
    Ok(floored as i64)
}

pub fn nroot(x: f64, n: i64) -> Result<f64, CallError> {
    if n == 0 {
        return Err(CallError::Domain("the 0th root is undefined".to_string()));
    }
    if x < 0.0 && n % 2 == 0 {
        return Err(CallError::Domain(format!(
            "even root (n={n}) of negative number {x} is not a real number"
        )));
    }

    let degree = n.unsigned_abs() as f64;
    let magnitude = x.abs().powf(1.0 / degree);
    let root = if x < 0.0 { -magnitude } else { magnitude };
    let root = if n < 0 { 1.0 / root } else { root };

    if !root.is_finite() {
        return Err(CallError::Domain(format!("nroot({x}, {n}) is not a finite number")));
    }
    Ok(root)
}

pub fn reverse(s: &str) -> String {
    s.chars().rev().collect()
}

/// Case-insensitive; strings of different length are never anagrams.
pub fn valid_anagram(a: &str, b: &str) -> bool {
    if a.chars().count() != b.chars().count() {
        return false;
    }
    letters(a) == letters(b)
}

fn letters(s: &str) -> Vec<char> {
    let mut chars: Vec<char> = s.chars().flat_map(char::to_lowercase).collect();
    chars.sort_unstable();
    chars
}

/// Stable sort using the Unicode root collation, so accented letters sit
/// next to their base letter and lowercase precedes uppercase.
pub fn sort(mut items: Vec<&str>) -> Result<Vec<String>, CallError> {
    let collator = Collator::try_new(Default::default(), CollatorOptions::default())
        .map_err(|e| CallError::Domain(format!("collation data unavailable: {e}")))?;
    items.sort_by(|a, b| collator.compare(a, b));
    Ok(items.into_iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_rounds_toward_negative_infinity() {
        assert_eq!(floor(3.7).unwrap(), 3);
        assert_eq!(floor(-3.2).unwrap(), -4);
        assert_eq!(floor(5.0).unwrap(), 5);
    }

    #[test]
    fn floor_is_idempotent() {
        for x in [-1e9 - 0.5, -2.5, -0.0, 0.1, 7.999, 123456.75] {
            let once = floor(x).unwrap();
            assert_eq!(floor(once as f64).unwrap(), once);
        }
    }

    #[test]
    fn floor_rejects_out_of_range() {
        assert!(matches!(floor(f64::NAN), Err(CallError::Domain(_))));
        assert!(matches!(floor(1e300), Err(CallError::Domain(_))));
    }

    #[test]
    fn nroot_computes_real_roots() {
        assert!((nroot(16.0, 2).unwrap() - 4.0).abs() < 1e-12);
        assert!((nroot(27.0, 3).unwrap() - 3.0).abs() < 1e-12);
        assert!((nroot(-8.0, 3).unwrap() + 2.0).abs() < 1e-12);
        assert!((nroot(4.0, -2).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn nroot_rejects_even_root_of_negative() {
        let err = nroot(-8.0, 2).unwrap_err();
        assert!(matches!(err, CallError::Domain(msg) if msg.contains("even root")));
    }

    #[test]
    fn nroot_rejects_zero_degree_and_infinite_results() {
        assert!(matches!(nroot(8.0, 0), Err(CallError::Domain(_))));
        assert!(matches!(nroot(0.0, -2), Err(CallError::Domain(_))));
    }

    #[test]
    fn reverse_round_trips() {
        for s in ["", "a", "hello", "こんにちは", "añb"] {
            assert_eq!(reverse(&reverse(s)), s);
        }
        assert_eq!(reverse("abc"), "cba");
    }

    #[test]
    fn valid_anagram_matches_same_letters() {
        assert!(valid_anagram("listen", "silent"));
        assert!(valid_anagram("Listen", "Silent"));
        assert!(!valid_anagram("listen", "silenc"));
    }

    #[test]
    fn valid_anagram_is_symmetric_and_length_checked() {
        let pairs = [("abc", "cab"), ("abc", "abcd"), ("aab", "abb"), ("", "")];
        for (a, b) in pairs {
            assert_eq!(valid_anagram(a, b), valid_anagram(b, a));
        }
        assert!(!valid_anagram("ab", "abb"));
    }

    #[test]
    fn sort_groups_letters_regardless_of_case() {
        let sorted = sort(vec!["cherry", "Banana", "apple", "banana"]).unwrap();
        assert_eq!(sorted, ["apple", "banana", "Banana", "cherry"]);
    }

    #[test]
    fn sort_places_accented_letters_with_their_base() {
        let sorted = sort(vec!["zebra", "éclair", "eagle", "fig"]).unwrap();
        assert_eq!(sorted, ["eagle", "éclair", "fig", "zebra"]);
    }

    #[test]
    fn sort_orders_hiragana() {
        let sorted = sort(vec!["さくら", "あめ", "かさ"]).unwrap();
        assert_eq!(sorted, ["あめ", "かさ", "さくら"]);
    }

    #[test]
    fn sort_is_idempotent() {
        let once = sort(vec!["b", "A", "é", "a", "c", "B", "e"]).unwrap();
        let refs: Vec<&str> = once.iter().map(String::as_str).collect();
        assert_eq!(sort(refs).unwrap(), once);
    }
}
