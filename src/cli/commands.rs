use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "convograph")]
#[command(author, version, about = "Conversation service with bounded-history summarization", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Bind address (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Start an interactive chat on one thread
    Chat {
        /// Thread to continue (default: a new random id)
        #[arg(short, long)]
        thread_id: Option<String>,

        /// Talk to a running server instead of an in-process service
        #[arg(short, long)]
        remote: Option<String>,
    },

    /// Print the stored messages and summary of a thread
    State {
        thread_id: String,

        #[arg(short, long)]
        remote: Option<String>,
    },

    /// Delete all stored state of a thread
    Delete {
        thread_id: String,

        #[arg(short, long)]
        remote: Option<String>,
    },

    /// List threads in the configured store
    Threads,
}
