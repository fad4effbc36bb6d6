use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Backend Args ---
    /// Base URL of the agent backend (e.g., http://127.0.0.1:50505)
    #[arg(long, env = "AGENT_CHAT_BASE_URL", default_value = "http://127.0.0.1:50505")]
    pub base_url: String,

    /// Route that accepts `{"message": ...}` and streams the reply.
    #[arg(long, env = "AGENT_CHAT_ROUTE", default_value = "/chat")]
    pub chat_route: String,

    /// Route returning prior turns, newest first.
    #[arg(long, env = "AGENT_HISTORY_ROUTE", default_value = "/chat/history")]
    pub history_route: String,

    /// Route serving cited documents (`?file_name=`).
    #[arg(long, env = "AGENT_DOCUMENT_ROUTE", default_value = "/fetch-document")]
    pub document_route: String,

    // --- General App Args ---
    /// Do not load the conversation history on startup
    #[arg(long, env = "AGENT_SKIP_HISTORY", default_value = "false")]
    pub skip_history: bool,

    /// Send this message, print the reply and exit instead of reading stdin.
    #[arg(short = 'm', long)]
    pub message: Option<String>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}
