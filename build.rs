//! Build script rendering the demo binary's manual page.

use std::{env, fs, path::PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

const MAN_DIR: &str = "target/generated-man";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-env-changed=PEERFRAME_MAN_DIR");

    let out_dir =
        env::var_os("PEERFRAME_MAN_DIR").map_or_else(|| PathBuf::from(MAN_DIR), PathBuf::from);
    fs::create_dir_all(&out_dir)?;

    let version = env::var("CARGO_PKG_VERSION")?;
    let page = Man::new(cli::Cli::command())
        .section("1")
        .source(format!("peerframe {version}"))
        .manual("peerframe demo");
    let mut buf = Vec::new();
    page.render(&mut buf)?;
    fs::write(out_dir.join("peerframe.1"), buf)?;

    Ok(())
}
