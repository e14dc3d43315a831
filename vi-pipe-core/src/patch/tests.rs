//! Tests for the patch codec

use super::*;

fn make(original: &str, edited: &str) -> String {
    make_patch(original, edited, DEFAULT_CONTEXT_LINES)
}

#[test]
fn test_identical_texts_give_empty_patch() {
    let text = "alpha\nbeta\ngamma\n";
    let patch = make(text, text);
    assert!(patch.is_empty(), "identical texts should not produce hunks: {patch:?}");
    assert_eq!(apply_patch(&patch, text), text);
}

#[test]
fn test_single_line_change_format() {
    let patch = make("line1\nline2\n", "line1\nLINE2\n");
    assert_eq!(patch, "@@ -1,2 +1,2 @@\n line1\n-line2\n+LINE2\n");
}

#[test]
fn test_replay_reproduces_edit() {
    let original = "one\ntwo\nthree\nfour\nfive\nsix\nseven\neight\nnine\nten\n";
    let edited = "one\n2\nthree\nfour\nfive\nsix\nseven\neight\nnine\nten\neleven\n";
    let patch = make(original, edited);
    assert_eq!(apply_patch(&patch, original), edited);
}

#[test]
fn test_replay_deletion_and_insertion_at_start() {
    let original = "header\nbody\nfooter\n";
    let edited = "# generated\nbody\nfooter\n";
    let patch = make(original, edited);
    assert_eq!(apply_patch(&patch, original), edited);
}

#[test]
fn test_missing_trailing_newline_round_trips() {
    let original = "a\nb";
    let edited = "a\nB";
    let patch = make(original, edited);
    assert!(patch.contains(NO_NEWLINE_MARKER));
    assert_eq!(apply_patch(&patch, original), edited);
}

#[test]
fn test_adding_trailing_newline_round_trips() {
    let original = "a\nb";
    let edited = "a\nb\n";
    let patch = make(original, edited);
    assert_eq!(apply_patch(&patch, original), edited);
}

#[test]
fn test_edit_from_empty_input() {
    let patch = make("", "hello\nworld\n");
    assert_eq!(apply_patch(&patch, ""), "hello\nworld\n");
}

#[test]
fn test_edit_to_empty_output() {
    let original = "drop\nall\nof\nthis\n";
    let patch = make(original, "");
    assert_eq!(apply_patch(&patch, original), "");
}

#[test]
fn test_applies_with_shifted_offsets() {
    let original = "a\nb\nc\nd\ne\n";
    let edited = "a\nb\nC\nd\ne\n";
    let patch = make(original, edited);

    // New lines arrived above the edited region
    let shifted = "new1\nnew2\nnew3\na\nb\nc\nd\ne\n";
    assert_eq!(apply_patch(&patch, shifted), "new1\nnew2\nnew3\na\nb\nC\nd\ne\n");
}

#[test]
fn test_applies_with_drifted_context() {
    let original = "1\n2\n3\ntarget\n5\n6\n7\n";
    let edited = "1\n2\n3\nTARGET\n5\n6\n7\n";
    let patch = make(original, edited);

    // Outermost context lines changed, the lines next to the edit did not
    let drifted = "one\n2\n3\ntarget\n5\n6\nseven\n";
    assert_eq!(apply_patch(&patch, drifted), "one\n2\n3\nTARGET\n5\n6\nseven\n");
}

#[test]
fn test_multiple_hunks_apply_in_order() {
    let original: String = (1..=30).map(|i| format!("line {i}\n")).collect();
    let edited = original
        .replace("line 2\n", "line two\n")
        .replace("line 25\n", "line 25\nline 25.5\n");
    let patch = make(&original, &edited);
    assert_eq!(patch.matches("@@ -").count(), 2);
    assert_eq!(apply_patch(&patch, &original), edited);
}

#[test]
fn test_unmatched_hunk_is_skipped() {
    let original: String = (1..=30).map(|i| format!("line {i}\n")).collect();
    let edited = original
        .replace("line 2\n", "line two\n")
        .replace("line 25\n", "line twenty-five\n");
    let patch = make(&original, &edited);

    // The region of the first hunk no longer exists at all
    let changed: String = (20..=30).map(|i| format!("line {i}\n")).collect();
    let result = apply_patch(&patch, &changed);
    assert_eq!(result, changed.replace("line 25\n", "line twenty-five\n"));
}

#[test]
fn test_garbage_patch_is_identity() {
    let text = "keep\nme\n";
    for garbage in [
        "not a patch",
        "@@ nonsense @@\n",
        "@@ -1,2 +1,2 @@\n line1\n",
        "@@ -1,1 +1,1 @@\n?odd\n",
        "\\ No newline at end of file\n",
        "\u{0}\u{1}binary",
    ] {
        assert_eq!(apply_patch(garbage, text), text, "patch {garbage:?}");
    }
}

#[test]
fn test_empty_and_blank_patch_is_identity() {
    let text = "keep\nme\n";
    assert_eq!(apply_patch("", text), text);
    assert_eq!(apply_patch("\n\n  \n", text), text);
}

#[test]
fn test_full_unified_diff_headers_are_accepted() {
    let patch = "--- a/input\n+++ b/input\n@@ -1,2 +1,2 @@\n line1\n-line2\n+LINE2\n";
    assert_eq!(apply_patch(patch, "line1\nline2\n"), "line1\nLINE2\n");
}

#[test]
fn test_blank_context_line_without_space() {
    let patch = "@@ -1,3 +1,3 @@\n a\n\n-c\n+C\n";
    assert_eq!(apply_patch(patch, "a\n\nc\n"), "a\n\nC\n");
}

#[test]
fn test_crlf_lines_are_preserved() {
    let original = "a\r\nb\r\nc\r\n";
    let edited = "a\r\nB\r\nc\r\n";
    let patch = make(original, edited);
    assert_eq!(apply_patch(&patch, original), edited);
}

#[test]
fn test_bare_carriage_return_stays_inside_line() {
    let original = "10%\r100%\nresult\n";
    let edited = "result\n";
    let patch = make(original, edited);
    assert_eq!(patch, "@@ -1,2 +1,1 @@\n-10%\r100%\n result\n");
    assert_eq!(apply_patch(&patch, original), edited);
}

#[test]
fn test_trailing_bare_carriage_return_round_trips() {
    let original = "start\rwork\rdone\r";
    let edited = "start\rdone\r";
    for context in [0, 3] {
        let patch = make_patch(original, edited, context);
        assert_eq!(patch.matches(NO_NEWLINE_MARKER).count(), 2, "{patch:?}");
        assert_eq!(apply_patch(&patch, original), edited);
    }
}

#[test]
fn test_repeated_lines_replay() {
    let cases = [
        ("b\nb\nx y\na\n", "x y\nx y\n"),
        ("a\nq\r\nq\n", "a\r\na\n\r\na\n"),
        ("a\na\na\nb\n", "b\na\na\na\n"),
        ("x\ny\nx\ny\nx\n", "y\nx\ny\n"),
    ];
    for (original, edited) in cases {
        for context in [0, 1, 3] {
            let patch = make_patch(original, edited, context);
            assert_eq!(
                apply_patch(&patch, original),
                edited,
                "context {context}, patch {patch:?}"
            );
        }
    }
}

#[test]
fn test_hunk_header_counts_match_body() {
    let patch = make("b\nb\nx y\na\n", "x y\nx y\n");
    let hunks = parse_patch(&patch).unwrap();
    assert_eq!(hunks.len(), 1);
    assert_eq!(hunks[0].old_count(), hunks[0].header.old_len);
    assert_eq!(hunks[0].new_count(), hunks[0].header.new_len);
    assert_eq!(hunks[0].header.new_len, 2);
}

#[test]
fn test_zero_context_patch_replays() {
    let original = "a\nb\nc\n";
    let edited = "a\nb\nc\nd\n";
    let patch = make_patch(original, edited, 0);
    assert_eq!(patch, "@@ -3,0 +4,1 @@\n+d\n");
    assert_eq!(apply_patch(&patch, original), edited);
}

#[test]
fn test_parse_header_defaults_length_to_one() {
    let header = parse_header("@@ -5 +5 @@").unwrap();
    assert_eq!(header.old_start, 4);
    assert_eq!(header.old_len, 1);
    assert_eq!(header.new_len, 1);
}

#[test]
fn test_header_display_round_trips() {
    for line in ["@@ -1,2 +1,2 @@", "@@ -0,0 +1,3 @@", "@@ -3,0 +4,1 @@", "@@ -2,3 +1,0 @@"] {
        let header = parse_header(line).unwrap();
        assert_eq!(header.to_string(), line);
    }
}

mod replay_fidelity {
    use crate::patch::{apply_patch, make_patch};
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]

        /// Small alphabets give repeated lines, bare `\r` and missing final newlines
        #[test]
        fn test_replay_reproduces_any_edit(
            original in r"[ab\r\n]{0,24}",
            edited in r"[ab\r\n]{0,24}",
            context in 0usize..4,
        ) {
            let patch = make_patch(&original, &edited, context);
            prop_assert_eq!(apply_patch(&patch, &original), edited);
        }

        #[test]
        fn test_identical_texts_never_produce_hunks(
            text in r"[ab \r\n]{0,40}",
            context in 0usize..4,
        ) {
            prop_assert!(make_patch(&text, &text, context).is_empty());
        }

        #[test]
        fn test_apply_tolerates_arbitrary_hunks(
            patch in r"(@@ -[0-9],[0-9] \+[0-9],[0-9] @@\n|[ +\-][ab]*\n|\\ No newline at end of file\n){0,8}",
            text in r"[ab\n]{0,16}",
        ) {
            let _ = apply_patch(&patch, &text);
        }
    }
}
