use quickcheck::{quickcheck, TestResult};

use cre::{Pattern, PatternBuilder};

const PATTERNS: &[&str] = &[
    "a(b|c)*",
    "233?",
    "2{3,}",
    "[^abc]+",
    "[a-c]+[A-C]",
    "1[0-9]{2}",
    r"\w+",
    "ab|c*",
];

quickcheck! {
    fn match_returns_a_prefix(text: String) -> bool {
        PATTERNS.iter().all(|pattern| {
            let m = cre::match_(pattern, &text);
            m.len() <= text.len() && text.starts_with(m.as_str())
        })
    }

    fn compilation_is_idempotent(text: String) -> bool {
        PATTERNS.iter().all(|pattern| {
            let a = Pattern::new(pattern);
            let b = Pattern::new(pattern);
            a.match_(&text) == b.match_(&text)
                && a.search(&text) == b.search(&text)
                && a.matches(&text) == b.matches(&text)
        })
    }

    fn minimization_preserves_the_language(text: String) -> bool {
        PATTERNS.iter().all(|pattern| {
            let (min, _) = PatternBuilder::new().build(pattern);
            let (raw, _) =
                PatternBuilder::new().minimize(false).build(pattern);
            min.match_(&text) == raw.match_(&text)
                && min.search(&text) == raw.search(&text)
                && min.replace(&text, "#") == raw.replace(&text, "#")
                && min.matches(&text) == raw.matches(&text)
        })
    }

    fn matches_are_substrings(text: String) -> bool {
        PATTERNS.iter().all(|pattern| {
            Pattern::new(pattern)
                .matches(&text)
                .iter()
                .all(|m| !m.is_empty() && text.contains(m.as_str()))
        })
    }

    fn replace_with_empty_target_removes_every_match(text: String) -> bool {
        let replaced = cre::replace("[0-9]+", &text, "");
        replaced.len() <= text.len()
            && !replaced.bytes().any(|b| b.is_ascii_digit())
    }

    fn negated_class_is_the_complement(b: u8) -> TestResult {
        if b >= 128 {
            return TestResult::discard();
        }
        let text = String::from_utf8(vec![b]).unwrap();
        let m = cre::match_("[^abc]", &text);
        let expected =
            if b"abc".contains(&b) { "" } else { text.as_str() };
        TestResult::from_bool(m == expected)
    }
}
