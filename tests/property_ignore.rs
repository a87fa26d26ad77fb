// tests/property_ignore.rs

use std::path::PathBuf;

use proptest::prelude::*;

use devrunner::config::parse_command_string;
use devrunner::watch::IgnorePolicy;

const ROOT: &str = "/proj";

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.-]{0,7}"
}

fn policy(ignored: &[String]) -> IgnorePolicy {
    IgnorePolicy::new(ROOT, ignored.iter().cloned())
}

proptest! {
    // A path is ignored exactly when one of its segments equals an entry.
    #[test]
    fn ignored_iff_some_segment_matches(
        segments in proptest::collection::vec(segment(), 1..6),
        ignored in proptest::collection::vec(segment(), 0..4),
    ) {
        let mut path = PathBuf::from(ROOT);
        path.extend(&segments);

        let expected = segments.iter().any(|s| ignored.contains(s));
        prop_assert_eq!(policy(&ignored).is_ignored(&path), expected);
    }

    // Extending a segment never turns it into a match: `distribution` is not `dist`.
    #[test]
    fn prefixes_of_an_entry_do_not_match(
        entry in segment(),
        suffix in "[a-z0-9]{1,6}",
        depth in 0usize..3,
    ) {
        let mut path = PathBuf::from(ROOT);
        for i in 0..depth {
            path.push(format!("D{i}"));
        }
        path.push(format!("{entry}{suffix}"));

        prop_assert!(!policy(&[entry]).is_ignored(&path));
    }

    // Paths outside the project root are always ignored.
    #[test]
    fn outside_the_root_is_ignored(segments in proptest::collection::vec(segment(), 1..4)) {
        let mut path = PathBuf::from("/other");
        path.extend(&segments);

        prop_assert!(policy(&[]).is_ignored(&path));
    }

    // Splitting a command line keeps every non-blank token in order.
    #[test]
    fn command_lines_split_on_whitespace(
        tokens in proptest::collection::vec("[A-Za-z0-9=./:-]{1,8}", 1..6),
        gaps in proptest::collection::vec(prop_oneof![Just(" "), Just("  "), Just("\t")], 6),
    ) {
        let mut line = String::from(gaps[0]);
        for (i, token) in tokens.iter().enumerate() {
            line.push_str(token);
            line.push_str(gaps[(i + 1) % gaps.len()]);
        }

        let spec = parse_command_string(&line).unwrap();

        prop_assert_eq!(&spec.command, &tokens[0]);
        prop_assert_eq!(&spec.args[..], &tokens[1..]);
        prop_assert!(!spec.shell);
    }
}

#[test]
fn blank_command_lines_are_rejected() {
    for line in ["", "   ", "\t \n"] {
        assert!(parse_command_string(line).is_err(), "{line:?}");
    }
}
