//! Command line interface for the peerframe demo binary.
//!
//! The binary runs both roles of one session over an in-memory network and
//! streams records from the app side to the embed side.

use clap::Parser;

/// Command line arguments for the `peerframe` binary.
#[derive(Debug, Parser)]
#[command(
    name = "peerframe",
    version,
    about = "Stream records between the two roles of a session"
)]
pub struct Cli {
    /// Session identifier shared by both roles.
    #[arg(short, long, default_value = "demo")]
    pub uid: String,
    /// Number of records to send.
    #[arg(short, long, default_value_t = 3)]
    pub records: u64,
    /// Characters of filler in each record.
    #[arg(long, default_value_t = 500_000)]
    pub record_size: usize,
    /// Largest message sent without fragmentation, in characters.
    #[arg(long, default_value_t = 200_000)]
    pub max_payload: usize,
}
