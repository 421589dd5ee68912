use std::path::Path;
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the fleet route simulator workspace",
    long_about = "A unified CLI for running the route replay demo, benchmarks,\n\
                  and CI checks in the fleet route simulator workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the route replay demo (two vehicles on Johannesburg routes)
    Replay,
    /// Run fleet_core tests, optionally one suite
    Test {
        #[arg(value_enum)]
        suite: Option<TestSuite>,
    },
    /// Run Criterion benchmarks
    Bench,
    /// Compare benchmarks: stash changes, create baseline, restore, compare
    BenchCompare,
    /// Run CI checks (fmt, clippy, tests, examples, benchmarks)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Build and run the demo
    Examples,
    /// Run benchmarks
    Bench,
    /// Run check + examples + bench
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum TestSuite {
    /// Unit tests inside the library
    Unit,
    /// Paused-clock route lifecycle tests
    Lifecycle,
    /// Start/stop/restart control tests
    Control,
    /// Multi-threaded stop and restart races
    Concurrency,
    /// JSON scenario loading
    Scenario,
}

impl TestSuite {
    fn cargo_args(self) -> &'static [&'static str] {
        match self {
            Self::Unit => &["--lib"],
            Self::Lifecycle => &["--test", "system_route_lifecycle_tests"],
            Self::Control => &["--test", "system_route_control_tests"],
            Self::Concurrency => &["--test", "integration_concurrency_tests"],
            Self::Scenario => &["--test", "integration_scenario_tests"],
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn git(args: &[&str]) -> ExitStatus {
    eprintln!("+ git {}", args.join(" "));
    Command::new("git")
        .args(args)
        .status()
        .expect("failed to execute git")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn run_git(args: &[&str]) {
    let status = git(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn run_bench(extra: &[&str]) {
    let mut args = vec!["bench", "--package", "fleet_core", "--bench", "performance"];
    if !extra.is_empty() {
        args.push("--");
        args.extend_from_slice(extra);
    }
    run_cargo(&args);
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test fleet_core");
    run_cargo(&["test", "-p", "fleet_core"]);

    step("Test fleet_core without test helpers");
    run_cargo(&["test", "-p", "fleet_core", "--lib", "--no-default-features"]);
}

fn ci_examples() {
    step("Run route_replay");
    run_cargo(&["run", "-p", "fleet_core", "--example", "route_replay"]);
}

fn ci_bench() {
    step("Run benchmarks");
    run_bench(&[]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay => {
            run_cargo(&["run", "-p", "fleet_core", "--example", "route_replay"]);
        }
        Commands::Test { suite } => {
            let mut args = vec!["test", "-p", "fleet_core"];
            if let Some(suite) = suite {
                args.extend_from_slice(suite.cargo_args());
            }
            run_cargo(&args);
        }
        Commands::Bench => run_bench(&[]),
        Commands::BenchCompare => {
            let baseline_dir = Path::new("target/criterion");
            if baseline_dir.exists() {
                step("Removing existing benchmark data");
                std::fs::remove_dir_all(baseline_dir).expect("failed to remove target/criterion");
            }

            step("Stashing current changes");
            run_git(&[
                "stash",
                "push",
                "-m",
                "Temporary stash for benchmark comparison",
            ]);

            step("Running benchmark to create baseline");
            run_bench(&["--save-baseline", "main"]);

            step("Reapplying changes");
            run_git(&["stash", "pop"]);

            step("Running benchmark comparing against baseline");
            run_bench(&["--baseline", "main"]);

            eprintln!("\nDone! Check the output above to see performance comparison.");
        }
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Examples => ci_examples(),
                CiJob::Bench => ci_bench(),
                CiJob::All => {
                    ci_check();
                    ci_examples();
                    ci_bench();
                }
            }
            eprintln!("\nCI job passed.");
        }
    }
}
