//! catalog-agent binary: send one message to a thread and print the reply.

use std::path::PathBuf;

use clap::Parser;
use catalog_agent_cli::{history, init_tracing, run, RunOptions};

#[derive(Parser, Debug)]
#[command(name = "catalog-agent")]
#[command(about = "Catalog assistant: ask about items, continue a thread with -t")]
struct Args {
    /// Thread to continue; a new one is created when omitted.
    #[arg(short = 't', long, value_name = "ID")]
    thread_id: Option<String>,

    /// JSON array of catalog items to load (and embed) before answering.
    #[arg(long, value_name = "FILE")]
    catalog_json: Option<PathBuf>,

    /// Print the thread's checkpoint history instead of sending a message.
    #[arg(long)]
    history: bool,

    /// Debug logging to stderr.
    #[arg(short, long)]
    verbose: bool,

    /// The message to send.
    #[arg(trailing_var_arg = true, required_unless_present = "history")]
    message: Vec<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let options = RunOptions {
        thread_id: args.thread_id.clone(),
        catalog_json: args.catalog_json.clone(),
        verbose: args.verbose,
        ..RunOptions::default()
    };

    if args.history {
        match history(&options).await {
            Ok(lines) => {
                for line in lines {
                    println!("{}", line);
                }
            }
            Err(e) => {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let message = args.message.join(" ").trim().to_string();
    let out = match run(&message, &options).await {
        Ok(out) => out,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    println!("thread: {}", out.thread_id);
    match out.reply {
        Ok(reply) => println!("{}", reply.text),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
