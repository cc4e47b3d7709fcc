use std::process;

use clap::Parser;

#[macro_use]
extern crate log;

/// Parse command line arguments and run the pipeline.
fn main() {
    let cli = parser::Cli::parse();

    // ----------------------------- Init logger.
    logger::init(cli.verbose + u8::from(!cli.quiet));

    // ----------------------------- Serialize command line arguments.
    cli.serialize();

    // ----------------------------- Validate before any pass begins.
    if let Err(e) = cli.validate() {
        error!("{e}");
        process::exit(1);
    }

    // ----------------------------- Run.
    match aodp_rs::run(&cli) {
        Ok(()) => (),
        Err(e) => {
            error!("{e:#}");
            process::exit(1);
        }
    }
}
