// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::k_limits;

use clap::{App, AppSettings, Arg, ArgMatches, ErrorKind};
use std::fmt::{Display, Formatter};

/// The environment variable consulted by Options::from_env.
pub const FLAGS_ENV_VAR: &str = "POINTS_TO_FLAGS";

/// Creates the clap::App metadata for argument parsing.
fn make_options_parser<'a>() -> App<'a, 'a> {
    App::new("points-to")
    .setting(AppSettings::NoBinaryName)
    .version("v0.1.0")
    .arg(Arg::with_name("single_func")
        .long("single_func")
        .takes_value(true)
        .help("Focus analysis on the named routine."))
    .arg(Arg::with_name("diag")
        .long("diag")
        .possible_values(&["default", "paranoid"])
        .default_value("default")
        .help("Level of diagnostics.\n")
        .long_help("With `default`, hitting an iteration limit is only logged at debug level.\nWith `paranoid`, it is logged as a warning.\n"))
    .arg(Arg::with_name("max_fixpoint_iterations")
        .long("max_fixpoint_iterations")
        .takes_value(true)
        .help("The maximum number of times a single block is visited.")
        .long_help("The default is 50."))
    .arg(Arg::with_name("widen_after")
        .long("widen_after")
        .takes_value(true)
        .help("The number of visits of a loop anchor after which its state is widened.")
        .long_help("The default is 3."))
    .arg(Arg::with_name("worklist_order")
        .long("worklist_order")
        .possible_values(&["rpo", "reverse_rpo"])
        .default_value("rpo")
        .help("The order in which pending blocks are taken off the worklist."))
}

/// Represents options passed to the analysis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub single_func: Option<String>,
    pub diag_level: DiagLevel,
    pub max_fixpoint_iterations: usize,
    pub widen_after: usize,
    pub worklist_order: WorklistOrder,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            single_func: None,
            diag_level: DiagLevel::default(),
            max_fixpoint_iterations: k_limits::MAX_FIXPOINT_ITERATIONS,
            widen_after: k_limits::WIDEN_AFTER_ITERATIONS,
            worklist_order: WorklistOrder::default(),
        }
    }
}

/// Represents diag level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd)]
pub enum DiagLevel {
    /// Problems with the analysis itself, such as a block that does not stabilize, are logged
    /// at debug level.
    Default,
    /// Like Default, but problems with the analysis are logged as warnings.
    Paranoid,
}

impl Default for DiagLevel {
    fn default() -> Self {
        DiagLevel::Default
    }
}

/// Decides which pending block the fixed point engine visits next.
/// The final result does not depend on this, only the amount of work done to get there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorklistOrder {
    /// Lowest reverse postorder number first, i.e. predecessors before successors.
    ReversePostorder,
    /// Highest reverse postorder number first.
    ReverseOfReversePostorder,
}

impl Default for WorklistOrder {
    fn default() -> Self {
        WorklistOrder::ReversePostorder
    }
}

/// Reasons why an option string could not be turned into Options.
#[derive(Debug, PartialEq, Eq)]
pub enum OptionsError {
    /// The string could not be split using shell escaping rules.
    Split(String),
    /// clap rejected the arguments.
    Parse(String),
    /// An option that expects an integer got something else.
    NotAnInteger { option: &'static str, value: String },
}

impl Display for OptionsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionsError::Split(msg) => write!(f, "Cannot parse argument string: {}", msg),
            OptionsError::Parse(msg) => f.write_str(msg),
            OptionsError::NotAnInteger { option, value } => {
                write!(f, "--{} expects an integer, got {:?}", option, value)
            }
        }
    }
}

impl std::error::Error for OptionsError {}

impl Options {
    /// Reads options from the POINTS_TO_FLAGS environment variable, if it is set.
    pub fn from_env() -> Result<Options, OptionsError> {
        let mut options = Options::default();
        if let Ok(flags) = std::env::var(FLAGS_ENV_VAR) {
            options.parse_from_str(&flags)?;
        }
        Ok(options)
    }

    /// Parse options from an argument string. The argument string will be split using unix
    /// shell escaping rules.
    pub fn parse_from_str(&mut self, s: &str) -> Result<(), OptionsError> {
        let args = shellwords::split(s).map_err(|e| OptionsError::Split(format!("{:?}", e)))?;
        self.parse(&args)
    }

    /// Parses options from a list of strings.
    pub fn parse(&mut self, args: &[String]) -> Result<(), OptionsError> {
        let matches = match make_options_parser().get_matches_from_safe(args.iter()) {
            Ok(matches) => matches,
            Err(e) if e.kind == ErrorKind::HelpDisplayed || e.kind == ErrorKind::VersionDisplayed => {
                println!("{}\n", e.message);
                return Ok(());
            }
            Err(e) => return Err(OptionsError::Parse(e.message)),
        };

        if matches.is_present("single_func") {
            self.single_func = matches.value_of("single_func").map(|s| s.to_string());
        }
        self.diag_level = match matches.value_of("diag") {
            Some("paranoid") => DiagLevel::Paranoid,
            _ => DiagLevel::Default,
        };
        self.worklist_order = match matches.value_of("worklist_order") {
            Some("reverse_rpo") => WorklistOrder::ReverseOfReversePostorder,
            _ => WorklistOrder::ReversePostorder,
        };
        if let Some(n) = parse_usize(&matches, "max_fixpoint_iterations")? {
            self.max_fixpoint_iterations = n;
        }
        if let Some(n) = parse_usize(&matches, "widen_after")? {
            self.widen_after = n;
        }
        Ok(())
    }
}

fn parse_usize(matches: &ArgMatches<'_>, option: &'static str) -> Result<Option<usize>, OptionsError> {
    match matches.value_of(option) {
        Some(s) => s
            .parse::<usize>()
            .map(Some)
            .map_err(|_| OptionsError::NotAnInteger {
                option,
                value: s.to_owned(),
            }),
        None => Ok(None),
    }
}
