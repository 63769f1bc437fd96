//! The pipeline harness (spec §4.6): wires the parse driver and the
//! transformation engine into a single `Result`-returning call, plus an
//! extended junction-based variant for multi-stage/bifurcating pipelines.
use crate::config::EngineConfig;
use crate::driver::Driver;
use crate::error::{EngineError, ImplementationError, ParseErrorEntry};
use crate::node::{Node, RootNode};
use crate::parser::Grammar;
use crate::slice::Code;
use crate::transform::{self, TransformTable};
use std::collections::HashMap;

/// The result of [`Pipeline::run`] (spec §4.6.1): `(result-or-none, errors,
/// optional-AST)`. `result` is `None` when a fatal-severity error
/// short-circuited the pipeline before the compile stage ran; `errors` and
/// `ast` are populated up to whichever stage was last reached either way.
pub struct PipelineOutcome<C> {
    pub result: Option<C>,
    pub errors: Vec<ParseErrorEntry>,
    pub ast: Option<Node>,
}

/// The standard four-stage pipeline (spec §4.6.1): preprocess, parse,
/// transform, compile. A `Fatal`-severity entry recorded at any stage
/// short-circuits the remaining stages.
pub struct Pipeline<C> {
    pub preprocess: Option<Box<dyn Fn(String) -> String>>,
    pub grammar: Grammar,
    pub table: TransformTable,
    pub compile: Box<dyn Fn(&RootNode) -> Result<C, EngineError>>,
    pub config: EngineConfig,
}

impl<C> Pipeline<C> {
    pub fn new(
        grammar: Grammar,
        table: TransformTable,
        compile: Box<dyn Fn(&RootNode) -> Result<C, EngineError>>,
    ) -> Self {
        Self {
            preprocess: None,
            grammar,
            table,
            compile,
            config: EngineConfig::default(),
        }
    }

    pub fn with_preprocess(mut self, f: Box<dyn Fn(String) -> String>) -> Self {
        self.preprocess = Some(f);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn run(&self, input: &str) -> Result<PipelineOutcome<C>, EngineError> {
        let preprocessed = match &self.preprocess {
            Some(f) => f(input.to_string()),
            None => input.to_string(),
        };
        let code = Code::new(preprocessed);

        let mut root = Driver::new(&self.grammar, &code).parse();
        if root.has_severity_at_least(self.config.fatal_threshold) {
            return Ok(PipelineOutcome {
                result: None,
                errors: root.errors,
                ast: Some(root.node),
            });
        }

        let transform_errors =
            transform::transform_with_mode(&mut root.node, &self.table, self.config.development_mode);
        for entry in transform_errors {
            root.add_error(entry);
        }
        if root.has_severity_at_least(self.config.fatal_threshold) {
            return Ok(PipelineOutcome {
                result: None,
                errors: root.errors,
                ast: Some(root.node),
            });
        }

        let compiled = (self.compile)(&root)?;
        Ok(PipelineOutcome {
            result: Some(compiled),
            errors: root.errors,
            ast: Some(root.node),
        })
    }
}

/// One edge of an extended, junction-based pipeline (spec §4.6.2): take the
/// `RootNode` produced at stage `source`, run `callable`, and publish the
/// result as stage `target`.
pub struct Junction {
    pub source: String,
    pub target: String,
    pub callable: Box<dyn Fn(&RootNode) -> Result<RootNode, EngineError>>,
}

impl Junction {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        callable: Box<dyn Fn(&RootNode) -> Result<RootNode, EngineError>>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            callable,
        }
    }
}

/// A directed graph of [`Junction`]s over named stages. A stage may be the
/// `source` of more than one junction (bifurcation: one input feeds two
/// independent outputs), but each `target` name is produced by exactly one
/// junction — checked once at construction time.
pub struct JunctionPipeline {
    junctions: Vec<Junction>,
}

impl JunctionPipeline {
    pub fn new(junctions: Vec<Junction>) -> Result<Self, ImplementationError> {
        let mut seen_targets = std::collections::HashSet::new();
        for j in &junctions {
            if !seen_targets.insert(j.target.clone()) {
                return Err(ImplementationError::DuplicateJunctionTarget(
                    j.target.clone(),
                ));
            }
        }
        Ok(Self { junctions })
    }

    /// Runs every junction reachable from `start_stage`, processing a
    /// junction as soon as its source stage is available (so bifurcating
    /// branches progress independently), and returns every stage output by
    /// name. A cycle or an unreachable source is reported as a fatal error.
    pub fn run(
        &self,
        start: RootNode,
        start_stage: impl Into<String>,
    ) -> Result<HashMap<String, RootNode>, EngineError> {
        let mut outputs: HashMap<String, RootNode> = HashMap::new();
        outputs.insert(start_stage.into(), start);

        let mut remaining: Vec<&Junction> = self.junctions.iter().collect();
        while !remaining.is_empty() {
            let mut next_remaining = Vec::new();
            let mut progressed = false;
            for j in remaining {
                if !outputs.contains_key(&j.source) {
                    next_remaining.push(j);
                    continue;
                }
                let produced = {
                    let input = outputs.get(&j.source).unwrap();
                    (j.callable)(input)?
                };
                outputs.insert(j.target.clone(), produced);
                progressed = true;
            }
            if !progressed {
                let stalled: Vec<&str> = next_remaining.iter().map(|j| j.source.as_str()).collect();
                return Err(EngineError::Fatal(format!(
                    "junction pipeline stalled: no junction's source among {stalled:?} is available"
                )));
            }
            remaining = next_remaining;
        }
        Ok(outputs)
    }
}
