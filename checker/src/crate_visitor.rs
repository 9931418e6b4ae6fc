// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// 'compilation is the lifetime of the options and the routine bodies handed to the visitor.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::sync::Arc;
use std::time::Instant;

use log_derive::logfn;
use rayon::prelude::*;

use crate::cfg::RoutineBody;
use crate::options::Options;
use crate::points_to_analysis::{PointsToAnalysis, PointsToAnalysisResult};
use crate::summaries::Summary;

/// A visitor that analyzes a set of routine bodies, for example all of the routines of a
/// compilation unit. The routines are independent of each other, so they are analyzed in
/// parallel.
pub struct CrateVisitor<'compilation> {
    pub options: &'compilation Options,
    pub analysis: PointsToAnalysis,
}

impl<'compilation> Debug for CrateVisitor<'compilation> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        "CrateVisitor".fmt(f)
    }
}

impl<'compilation> CrateVisitor<'compilation> {
    pub fn new(options: &'compilation Options) -> CrateVisitor<'compilation> {
        CrateVisitor {
            options,
            analysis: PointsToAnalysis,
        }
    }

    /// Analyze the selected routines. If the options name a single function, only that one
    /// is analyzed. The results are in the same order as the routines.
    #[logfn(TRACE)]
    pub fn analyze_routines(&self, routines: &[RoutineBody]) -> Vec<PointsToAnalysisResult> {
        let start_instant = Instant::now();
        let selected: Vec<&RoutineBody> = routines
            .iter()
            .filter(|body| self.is_selected(body))
            .collect();
        let results: Vec<PointsToAnalysisResult> = selected
            .into_par_iter()
            .map(|body| {
                info!("analyzing function {}", body.name);
                self.analysis.analyze(body, self.options)
            })
            .collect();
        debug!(
            "analyzed {} of {} functions in {} ms",
            results.len(),
            routines.len(),
            start_instant.elapsed().as_millis()
        );
        results
    }

    /// Analyze the selected routines and collect their summaries, keyed by routine name.
    #[logfn(TRACE)]
    pub fn summaries(&self, routines: &[RoutineBody]) -> HashMap<Arc<str>, Summary> {
        self.analyze_routines(routines)
            .into_iter()
            .map(|result| (result.routine_name().clone(), result.summary))
            .collect()
    }

    fn is_selected(&self, body: &RoutineBody) -> bool {
        match &self.options.single_func {
            Some(func_name) if func_name.as_str() != body.name.as_ref() => {
                debug!(
                    "skipping function {} as it is not selected for analysis",
                    body.name
                );
                false
            }
            _ => true,
        }
    }
}
