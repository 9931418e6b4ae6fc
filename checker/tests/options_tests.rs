// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use points_to::k_limits;
use points_to::options::{DiagLevel, Options, OptionsError, WorklistOrder, FLAGS_ENV_VAR};

#[test]
fn defaults_come_from_k_limits() {
    let options = Options::default();
    assert_eq!(options.single_func, None);
    assert_eq!(options.diag_level, DiagLevel::Default);
    assert_eq!(options.max_fixpoint_iterations, k_limits::MAX_FIXPOINT_ITERATIONS);
    assert_eq!(options.widen_after, k_limits::WIDEN_AFTER_ITERATIONS);
    assert_eq!(options.worklist_order, WorklistOrder::ReversePostorder);
}

#[test]
fn parse_flag_string() {
    let mut options = Options::default();
    options
        .parse_from_str(
            "--single_func 'Foo.Bar' --diag paranoid --max_fixpoint_iterations 7 \
             --widen_after 2 --worklist_order reverse_rpo",
        )
        .unwrap();
    assert_eq!(options.single_func.as_deref(), Some("Foo.Bar"));
    assert_eq!(options.diag_level, DiagLevel::Paranoid);
    assert_eq!(options.max_fixpoint_iterations, 7);
    assert_eq!(options.widen_after, 2);
    assert_eq!(options.worklist_order, WorklistOrder::ReverseOfReversePostorder);
}

#[test]
fn empty_flag_string_keeps_defaults() {
    let mut options = Options::default();
    options.parse_from_str("").unwrap();
    assert_eq!(options, Options::default());
}

#[test]
fn non_integer_limit_is_rejected() {
    let mut options = Options::default();
    let error = options
        .parse_from_str("--max_fixpoint_iterations many")
        .unwrap_err();
    assert_eq!(
        error,
        OptionsError::NotAnInteger {
            option: "max_fixpoint_iterations",
            value: "many".to_owned(),
        }
    );
    assert!(error.to_string().contains("many"));
}

#[test]
fn unknown_option_is_rejected() {
    let mut options = Options::default();
    let result = options.parse_from_str("--no_such_option");
    assert!(matches!(result, Err(OptionsError::Parse(..))));
}

#[test]
fn unbalanced_quote_is_rejected() {
    let mut options = Options::default();
    let result = options.parse_from_str("--single_func 'Foo");
    assert!(matches!(result, Err(OptionsError::Split(..))));
}

#[test]
fn options_from_environment() {
    std::env::set_var(FLAGS_ENV_VAR, "--widen_after 5");
    let options = Options::from_env().unwrap();
    std::env::remove_var(FLAGS_ENV_VAR);
    assert_eq!(options.widen_after, 5);
    assert_eq!(options.max_fixpoint_iterations, k_limits::MAX_FIXPOINT_ITERATIONS);
}
