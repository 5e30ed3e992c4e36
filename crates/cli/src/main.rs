mod graph;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use docket_core::{authorize, Role, Status};
use docket_storage::conformance::run_conformance_suite;
use docket_storage::MemoryStore;

/// How command results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Municipal document workflow engine.
#[derive(Parser)]
#[command(name = "docket", version, about = "Municipal document workflow engine")]
struct Cli {
    /// Render results as text or json
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Print nothing; exit codes still carry the result
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the document lifecycle graph
    Graph,

    /// Check whether a role may request a transition
    Check {
        /// Status the document is currently in
        from: String,
        /// Requested destination status
        to: String,
        /// Role making the request
        #[arg(long)]
        role: String,
    },

    /// Run the storage conformance suite against the in-memory backend
    Conformance,

    /// Start the docket HTTP API server
    Serve {
        /// TCP port for the API server
        #[arg(long, default_value = "8080")]
        port: u16,
        /// TLS certificate (PEM); pair with --tls-key
        #[arg(long)]
        tls_cert: Option<PathBuf>,
        /// TLS private key (PEM); pair with --tls-cert
        #[arg(long)]
        tls_key: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Graph => {
            cmd_graph(cli.output);
        }
        Commands::Check { from, to, role } => {
            cmd_check(&from, &to, &role, cli.output, cli.quiet);
        }
        Commands::Conformance => {
            cmd_conformance(cli.output, cli.quiet);
        }
        Commands::Serve {
            port,
            tls_cert,
            tls_key,
        } => {
            // TLS flags only make sense as a pair
            if tls_cert.is_some() != tls_key.is_some() {
                eprintln!("error: --tls-cert and --tls-key must both be provided");
                process::exit(1);
            }
            let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
            if let Err(e) = rt.block_on(serve::start_server(port, tls_cert, tls_key)) {
                eprintln!("server error: {}", e);
                process::exit(1);
            }
        }
    }
}

fn cmd_graph(output: OutputFormat) {
    match output {
        OutputFormat::Text => print!("{}", graph::graph_text()),
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(&graph::graph_value())
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
    }
}

/// Exit codes: 0 allowed, 2 denied, 1 bad input.
fn cmd_check(from: &str, to: &str, role: &str, output: OutputFormat, quiet: bool) {
    let from = match from.parse::<Status>() {
        Ok(s) => s,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    let to = match to.parse::<Status>() {
        Ok(s) => s,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    let role = match role.parse::<Role>() {
        Ok(r) => r,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    match authorize(from, to, role) {
        Ok(()) => {
            if !quiet {
                match output {
                    OutputFormat::Text => {
                        println!("allowed: {} -> {} as {}", from, to, role);
                    }
                    OutputFormat::Json => {
                        println!("{{\"allowed\": true}}");
                    }
                }
            }
        }
        Err(reason) => {
            if !quiet {
                match output {
                    OutputFormat::Text => {
                        println!("denied: {}", reason);
                    }
                    OutputFormat::Json => {
                        let json = serde_json::json!({
                            "allowed": false,
                            "reason": reason,
                        });
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&json).unwrap_or_default()
                        );
                    }
                }
            }
            process::exit(2);
        }
    }
}

fn cmd_conformance(output: OutputFormat, quiet: bool) {
    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    let report = rt.block_on(run_conformance_suite(|| async { MemoryStore::new() }));

    if !quiet {
        match output {
            OutputFormat::Text => print!("{}", report),
            OutputFormat::Json => {
                let failures: Vec<serde_json::Value> = report
                    .results
                    .iter()
                    .filter(|r| !r.passed)
                    .map(|r| {
                        serde_json::json!({
                            "category": r.category,
                            "name": r.name,
                            "message": r.message,
                        })
                    })
                    .collect();
                let json = serde_json::json!({
                    "passed": report.passed,
                    "failed": report.failed,
                    "total": report.total,
                    "failures": failures,
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json).unwrap_or_default()
                );
            }
        }
    }

    if report.failed > 0 {
        process::exit(1);
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
