use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Bookmarks with semantic search", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API
    Daemon {
        /// Address to listen on (overrides server.listen from config.yaml)
        #[clap(long)]
        listen: Option<String>,
    },

    /// Add a bookmark
    Add {
        /// Bookmark url
        url: String,

        /// Bookmark title
        #[clap(short, long)]
        title: Option<String>,

        /// Text the bookmark is found by
        #[clap(short, long)]
        content: String,
    },

    /// Replace a bookmark's url, title and content
    Edit {
        /// Bookmark id
        id: u64,

        /// Bookmark url
        #[clap(short, long)]
        url: String,

        /// Bookmark title (omit to clear it)
        #[clap(short, long)]
        title: Option<String>,

        /// Text the bookmark is found by
        #[clap(short, long)]
        content: String,
    },

    /// Search bookmarks by meaning, falling back to substring matches
    Search {
        query: String,

        /// Print only the number of results
        #[clap(long, default_value = "false")]
        count: bool,
    },

    /// List all bookmarks, newest first
    List {},

    /// Show one bookmark
    Show { id: u64 },

    /// Delete a bookmark
    Delete {
        id: u64,

        /// Auto confirm
        #[clap(short, long, default_value = "false")]
        yes: bool,
    },
}
