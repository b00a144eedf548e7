use super::args::*;

mod common;
pub mod dataset;
pub mod flat;
pub mod summary;

use crate::exit_codes::SUCCESS;

pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Dataset(args) => dataset::run(args),
        Command::Summary(args) => summary::run(args),
        Command::Flat(args) => flat::run(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}
