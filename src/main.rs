//! Codex Compiler CLI
//!
//! The `codexc` command is the main entry point for the Codex compiler.

use clap::{Parser, Subcommand};
use codex::compiler::{self, CompileError};
use codex::config::CompilerConfig;
use codex::target::TargetLanguage;
use codex::{parser, printer, Compiler};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "codexc")]
#[command(version = codex::VERSION)]
#[command(about = "The Codex Compiler", long_about = None)]
struct Cli {
    /// Log every pipeline stage
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a Codex source file
    Build {
        /// Input file to compile
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to the input name with the target's extension)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Target language
        #[arg(short, long, value_name = "TARGET")]
        language: Option<TargetLanguage>,

        /// Configuration file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Emit AST (for debugging)
        #[arg(long)]
        emit_ast: bool,

        /// Emit the context sent with every fragment (for debugging)
        #[arg(long)]
        emit_context: bool,
    },

    /// Check a file for errors without generating code
    Check {
        /// Input file to check
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Target language
        #[arg(short, long, value_name = "TARGET")]
        language: Option<TargetLanguage>,
    },

    /// Parse a file and print AST
    Parse {
        /// Input file to parse
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Print a file in canonical form
    Fmt {
        /// Input file to format
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// List the supported target languages
    Languages,
}

fn init_logger(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn read_source(input: &Path) -> miette::Result<String> {
    fs::read_to_string(input).map_err(|e| miette::miette!("Failed to read file: {}", e))
}

fn report(err: CompileError) -> miette::Report {
    for message in err.messages() {
        eprintln!("error: {}", message);
    }
    miette::miette!("{}", err)
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Commands::Build {
            input,
            output,
            language,
            config,
            emit_ast,
            emit_context,
        } => {
            let source = read_source(&input)?;

            let mut config = CompilerConfig::load(config.as_deref())
                .map_err(|e| miette::miette!("{}", e))?;
            if let Some(language) = language {
                config.target = language;
            }
            let compiler =
                Compiler::from_config(&config).map_err(|e| miette::miette!("{}", e))?;

            if emit_ast || emit_context {
                let analysis = compiler.analyze(&source).map_err(report)?;
                if emit_ast {
                    println!("=== AST ===");
                    println!("{:#?}", analysis.program);
                }
                if emit_context {
                    println!("=== Context ===");
                    let json = serde_json::to_string_pretty(&analysis.sites)
                        .map_err(|e| miette::miette!("Failed to serialize context: {}", e))?;
                    println!("{}", json);
                }
            }

            println!("Compiling {} to {}...", input.display(), config.target);
            let compilation = compiler.compile(&source).await.map_err(report)?;

            let out_path = output.unwrap_or_else(|| {
                input.with_extension(compilation.target.rules().file_extension())
            });
            fs::write(&out_path, &compilation.output)
                .map_err(|e| miette::miette!("Failed to write {}: {}", out_path.display(), e))?;

            println!(
                "Generated {} fragment(s), {} warning(s): {}",
                compilation.fragment_count,
                compilation.warnings.len(),
                out_path.display()
            );
            Ok(())
        }

        Commands::Check { input, language } => {
            let source = read_source(&input)?;
            let target = language.unwrap_or_default();

            println!("Checking {}...", input.display());
            let analysis = compiler::analyze(&source, target).map_err(report)?;
            println!(
                "No errors found! ({} fragment(s) to generate for {}, {} warning(s))",
                analysis.sites.len(),
                target,
                analysis.warnings.len()
            );
            Ok(())
        }

        Commands::Parse { input } => {
            let source = read_source(&input)?;

            let (ast, errors) = parser::parse(&source);

            println!("{:#?}", ast);

            if !errors.is_empty() {
                eprintln!("\nParser errors:");
                for err in errors {
                    eprintln!("  {}", err);
                }
            }

            Ok(())
        }

        Commands::Fmt { input } => {
            let source = read_source(&input)?;

            let (ast, errors) = parser::parse(&source);
            if !errors.is_empty() {
                for err in &errors {
                    eprintln!("error: {}", err);
                }
                return Err(miette::miette!("Found {} syntax error(s)", errors.len()));
            }

            print!("{}", printer::print_program(&ast));
            Ok(())
        }

        Commands::Languages => {
            for target in TargetLanguage::ALL {
                let rules = target.rules();
                println!(
                    "{:<12} {:<12} .{:<4} {}",
                    target.name(),
                    rules.display_name(),
                    rules.file_extension(),
                    rules.description()
                );
            }
            Ok(())
        }
    }
}
