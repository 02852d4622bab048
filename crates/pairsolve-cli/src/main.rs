use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pairsolve_core::{Language, PairSolveConfig, Problem, ProblemSet};
use pairsolve_harness::{
    canonical, find_problem, load_catalog, parse_input, AdapterRegistry, Grader, RunOutcome,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pairsolve")]
#[command(about = "PairSolve - grade interview solutions in a remote sandbox", long_about = None)]
struct Cli {
    /// JSON config file (sandbox, session and catalog settings)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported languages and their sandbox runtimes
    Languages {
        #[arg(long)]
        json: bool,
    },

    /// Decode an example input such as `nums = [2,7,11,15], target = 9`
    Parse {
        input: String,
    },

    /// Show the entry point detected in a source file
    Signature {
        #[arg(short, long)]
        language: Language,

        /// Source file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        source: String,
    },

    /// Print the test program that would be sent to the sandbox
    Driver {
        #[command(flatten)]
        target: Target,
    },

    /// Grade a solution against every example of a problem
    Run {
        #[command(flatten)]
        target: Target,

        /// Print the graded run as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the problems in the catalog
    Problems {
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct Target {
    /// Problem set file or directory of them
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Problem id or title
    #[arg(short, long)]
    problem: String,

    #[arg(short, long)]
    language: Language,

    /// Source file, `-` for stdin
    #[arg(short, long, default_value = "-")]
    source: String,
}

#[derive(Serialize)]
struct LanguageRow {
    language: Language,
    label: &'static str,
    adapter: bool,
    runtime: Option<String>,
    file_name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = PairSolveConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load config")?;

    match cli.command {
        Commands::Languages { json } => cmd_languages(&config, json)?,
        Commands::Parse { input } => cmd_parse(&input),
        Commands::Signature { language, source } => cmd_signature(language, &source)?,
        Commands::Driver { target } => cmd_driver(&config, &target)?,
        Commands::Run { target, json } => cmd_run(&config, &target, json).await?,
        Commands::Problems { catalog } => cmd_problems(&config, catalog.as_deref())?,
    }

    Ok(())
}

fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read source from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))
}

fn catalog(config: &PairSolveConfig, path: Option<&Path>) -> Result<Vec<ProblemSet>> {
    let path = path
        .or(config.catalog.path.as_deref())
        .context("No catalog given; pass --catalog or set PAIRSOLVE_CATALOG")?;
    load_catalog(path).with_context(|| format!("Failed to load catalog {}", path.display()))
}

fn resolve(config: &PairSolveConfig, target: &Target) -> Result<(Problem, String)> {
    let sets = catalog(config, target.catalog.as_deref())?;
    let problem = find_problem(&sets, &target.problem)?.clone();
    let source = read_source(&target.source)?;
    Ok((problem, source))
}

fn cmd_languages(config: &PairSolveConfig, json: bool) -> Result<()> {
    let registry = AdapterRegistry::new();
    let rows: Vec<LanguageRow> = Language::all()
        .iter()
        .map(|&language| {
            let runtime = config.sandbox.runtime(language);
            LanguageRow {
                language,
                label: language.label(),
                adapter: registry.get(language).is_some(),
                runtime: runtime.map(|r| format!("{} {}", r.language, r.version)),
                file_name: runtime.map(|r| r.file_name.clone()),
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!();
    println!("Supported Languages:");
    println!("{:-<70}", "");
    println!("  {:<12} {:<14} {:<9} {:<18} {}", "ID", "Name", "Driver", "Runtime", "File");
    println!("{:-<70}", "");
    for row in &rows {
        println!(
            "  {:<12} {:<14} {:<9} {:<18} {}",
            row.language,
            row.label,
            if row.adapter { "yes" } else { "no" },
            row.runtime.as_deref().unwrap_or("-"),
            row.file_name.as_deref().unwrap_or("-"),
        );
    }
    println!();
    Ok(())
}

fn cmd_parse(input: &str) {
    for (i, arg) in parse_input(input).iter().enumerate() {
        println!("  {}: {}", i + 1, canonical(arg));
    }
}

fn cmd_signature(language: Language, source: &str) -> Result<()> {
    let source = read_source(source)?;
    let signature = AdapterRegistry::new().detect_signature(language, &source, None)?;
    println!("{}", serde_json::to_string_pretty(&signature)?);
    Ok(())
}

fn cmd_driver(config: &PairSolveConfig, target: &Target) -> Result<()> {
    let (problem, source) = resolve(config, target)?;
    match AdapterRegistry::new().synthesize_driver(
        target.language,
        &source,
        problem.starter(target.language),
        &problem.examples,
    ) {
        Ok(program) => print!("{}", program.source),
        Err(reason) => {
            eprintln!("No driver: {}", reason);
            eprintln!("The source would run as-is and be checked against the stored expected output.");
        }
    }
    Ok(())
}

async fn cmd_run(config: &PairSolveConfig, target: &Target, json: bool) -> Result<()> {
    let (problem, source) = resolve(config, target)?;
    let grader = Grader::from_config(&config.sandbox);

    let run = match grader.run(&problem, target.language, &source).await {
        RunOutcome::Completed(run) => run,
        RunOutcome::Superseded { ticket } => anyhow::bail!("Run {} was superseded", ticket),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(());
    }

    let verdict = &run.verdict;
    println!();
    println!("{} ({})", problem.title, target.language.label());
    println!("{:-<40}", "");
    println!("  Verdict:   {}", verdict.status);
    if verdict.total > 0 {
        println!("  Passed:    {}/{}", verdict.passed, verdict.total);
    }
    println!("  Runtime:   {} ms", verdict.runtime_ms);
    if let Some(error) = &verdict.error {
        println!("  Error:     {}", error);
    }
    for case in &verdict.cases {
        let mark = if case.passed { "PASS" } else { "FAIL" };
        println!();
        println!("  [{}] case {}: {}", mark, case.id + 1, case.input);
        if let Some(error) = &case.error {
            println!("         error:    {}", error);
            continue;
        }
        println!("         expected: {}", case.expected);
        println!("         actual:   {}", case.actual);
    }
    println!();
    Ok(())
}

fn cmd_problems(config: &PairSolveConfig, path: Option<&Path>) -> Result<()> {
    let sets = catalog(config, path)?;
    for set in &sets {
        println!();
        println!("{}:", set.name);
        println!("{:-<60}", "");
        for problem in &set.problems {
            println!(
                "  {:<24} {:<28} {}",
                problem.id,
                problem.title,
                problem.difficulty.label()
            );
        }
    }
    println!();
    Ok(())
}
