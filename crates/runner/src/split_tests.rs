// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn splits_on_whitespace() {
    assert_eq!(
        split_command("agent implement --fast"),
        Some(vec!["agent".into(), "implement".into(), "--fast".into()])
    );
}

#[test]
fn quotes_group_words() {
    assert_eq!(
        split_command(r#"sh -c "echo READY_FOR_REVIEW""#),
        Some(vec!["sh".into(), "-c".into(), "echo READY_FOR_REVIEW".into()])
    );
}

#[test]
fn single_quotes_preserve_double_quotes() {
    assert_eq!(
        split_command(r#"sh -c 'echo "x"'"#),
        Some(vec!["sh".into(), "-c".into(), r#"echo "x""#.into()])
    );
}

#[test]
fn unclosed_quote_is_rejected() {
    assert_eq!(split_command("sh -c 'oops"), None);
}

#[test]
fn empty_input_is_empty_argv() {
    assert_eq!(split_command("   "), Some(vec![]));
}

#[test]
fn adjacent_quoted_parts_join_into_one_word() {
    assert_eq!(split_command(r#"a"b c"d"#), Some(vec!["ab cd".into()]));
}
