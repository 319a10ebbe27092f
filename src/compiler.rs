//! The compilation pipeline
//!
//! parse -> symbol table -> imports -> context extraction -> generation -> assembly.
//! Every stage before generation is synchronous and pure; any error there stops the
//! pipeline before a single request is issued.

use crate::assemble::{assemble, AssemblyError};
use crate::ast::Program;
use crate::config::{CompilerConfig, ConfigError, GenerationPolicy};
use crate::context::{self, FragmentSite, ScopeError};
use crate::generate::{CodeGenerator, GenerationError, OpenAiGenerator, Orchestrator};
use crate::parser::{parse, SyntaxError};
use crate::scope::{self, SymbolTable};
use crate::target::{resolve_imports, ImportPlan, TargetLanguage, Warning};
use log::{debug, info, warn};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("found {} syntax error(s)", .0.len())]
    Syntax(Vec<SyntaxError>),

    #[error("found {} scope error(s)", .0.len())]
    Scope(Vec<ScopeError>),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("internal assembly error: {0}")]
    Assembly(#[from] AssemblyError),
}

impl CompileError {
    /// One message per underlying problem, in source order
    pub fn messages(&self) -> Vec<String> {
        match self {
            CompileError::Syntax(errors) => errors.iter().map(|e| e.to_string()).collect(),
            CompileError::Scope(errors) => errors.iter().map(|e| e.to_string()).collect(),
            CompileError::Generation(e) => vec![e.to_string()],
            CompileError::Assembly(e) => vec![e.to_string()],
        }
    }
}

/// Everything known about a program before generation
#[derive(Debug)]
pub struct Analysis {
    pub program: Program,
    pub table: SymbolTable,
    pub imports: ImportPlan,
    pub sites: Vec<FragmentSite>,
    pub warnings: Vec<Warning>,
}

/// A successful compilation
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    pub output: String,
    pub target: TargetLanguage,
    pub warnings: Vec<Warning>,
    pub fragment_count: usize,
}

/// Parse and analyze a program for `target` without generating anything
pub fn analyze(source: &str, target: TargetLanguage) -> Result<Analysis, CompileError> {
    let (program, mut syntax_errors) = parse(source);
    let (table, duplicates) = scope::build(&program);
    syntax_errors.extend(duplicates);
    if !syntax_errors.is_empty() {
        syntax_errors.sort_by_key(SyntaxError::line);
        return Err(CompileError::Syntax(syntax_errors));
    }

    let imports = resolve_imports(&program, target);
    let sites = context::extract(&program, &table);
    let (imports, sites) = match (imports, sites) {
        (Ok(imports), Ok(sites)) => (imports, sites),
        (imports, sites) => {
            let mut errors: Vec<ScopeError> = imports
                .err()
                .into_iter()
                .chain(sites.err())
                .flatten()
                .collect();
            errors.sort_by_key(ScopeError::line);
            return Err(CompileError::Scope(errors));
        }
    };

    let mut warnings = imports.warnings().to_vec();
    for site in &sites {
        for warning in imports.keyword_warnings(site.line, &site.instruction) {
            warn!("{}", warning);
            warnings.push(warning);
        }
    }
    warnings.sort_by_key(|w| w.line);

    debug!(
        "analysis: {} item(s), {} fragment(s), {} warning(s)",
        program.items.len(),
        sites.len(),
        warnings.len()
    );
    Ok(Analysis {
        program,
        table,
        imports,
        sites,
        warnings,
    })
}

pub struct Compiler {
    target: TargetLanguage,
    orchestrator: Orchestrator,
}

impl Compiler {
    pub fn new(
        target: TargetLanguage,
        generator: Arc<dyn CodeGenerator>,
        policy: GenerationPolicy,
    ) -> Self {
        Self {
            target,
            orchestrator: Orchestrator::new(generator, target, policy),
        }
    }

    /// A compiler backed by the HTTP generator described in `config`
    pub fn from_config(config: &CompilerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let generator = OpenAiGenerator::new(&config.generator)?;
        Ok(Self::new(
            config.target,
            Arc::new(generator),
            config.policy.clone(),
        ))
    }

    pub fn target(&self) -> TargetLanguage {
        self.target
    }

    /// Run every stage that does not need the generator
    pub fn analyze(&self, source: &str) -> Result<Analysis, CompileError> {
        analyze(source, self.target)
    }

    /// Compile a program to the target language.
    ///
    /// Either every fragment is generated and validated and the whole program is
    /// returned, or nothing is.
    pub async fn compile(&self, source: &str) -> Result<Compilation, CompileError> {
        let analysis = self.analyze(source)?;

        info!(
            "generating {} fragment(s) for {}",
            analysis.sites.len(),
            self.target
        );
        let fragments = self.orchestrator.generate_all(&analysis.sites).await?;

        let output = assemble(
            &analysis.program,
            &analysis.table,
            &analysis.imports,
            &fragments,
            self.target,
        )?;

        info!(
            "compiled {} fragment(s) into {} line(s) of {}",
            fragments.len(),
            output.lines().count(),
            self.target
        );
        Ok(Compilation {
            output,
            target: self.target,
            warnings: analysis.warnings,
            fragment_count: fragments.len(),
        })
    }
}
