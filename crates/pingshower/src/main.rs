#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::cast_precision_loss
)]
#![forbid(unsafe_code)]

use clap::Parser;
use config::{Args, PingConfig};

mod app;
mod config;
mod report;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    app::run_pingshower(&PingConfig::from(args))
}
