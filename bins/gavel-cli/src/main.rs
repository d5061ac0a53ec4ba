mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gavel-cli")]
#[command(about = "Gavel CLI - Judge submissions and inspect leaderboards", long_about = None)]
struct Cli {
    /// Base URL of the Gavel server
    #[arg(long, default_value = "http://127.0.0.1:3000", global = true)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a solution against a problem's visible samples
    Run {
        /// Problem id
        #[arg(short, long)]
        problem: String,

        /// Language name (e.g., python, cpp, java)
        #[arg(short, long)]
        language: String,

        /// Path to the solution source file
        #[arg(short, long)]
        file: String,
    },

    /// Submit a solution for full judging
    Submit {
        /// Problem id
        #[arg(short, long)]
        problem: String,

        /// Submitting user id
        #[arg(short, long)]
        user: String,

        /// Language name
        #[arg(short, long)]
        language: String,

        /// Path to the solution source file
        #[arg(short, long)]
        file: String,

        /// Contest id, when the submission belongs to a contest
        #[arg(short, long)]
        contest: Option<String>,
    },

    /// Register a contestant into a contest
    Register {
        #[arg(short, long)]
        contest: String,

        #[arg(short, long)]
        user: String,
    },

    /// Finalize a contestant's contest run
    Finish {
        #[arg(short, long)]
        contest: String,

        #[arg(short, long)]
        user: String,

        /// Completion wall-clock time, e.g. "12:45:30 PM"
        #[arg(short = 't', long)]
        completion_time: String,
    },

    /// Fetch a contest leaderboard (freezes the contest on first fetch)
    Leaderboard {
        #[arg(short, long)]
        contest: String,
    },

    /// Fetch the global leaderboard
    Global,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = commands::GavelClient::new(&cli.server);

    match cli.command {
        Commands::Run {
            problem,
            language,
            file,
        } => {
            client.run(&problem, &language, &file).await?;
        }
        Commands::Submit {
            problem,
            user,
            language,
            file,
            contest,
        } => {
            client
                .submit(&problem, &user, &language, &file, contest.as_deref())
                .await?;
        }
        Commands::Register { contest, user } => {
            client.register(&contest, &user).await?;
        }
        Commands::Finish {
            contest,
            user,
            completion_time,
        } => {
            client.finish(&contest, &user, &completion_time).await?;
        }
        Commands::Leaderboard { contest } => {
            client.contest_leaderboard(&contest).await?;
        }
        Commands::Global => {
            client.global_leaderboard().await?;
        }
    }

    Ok(())
}
