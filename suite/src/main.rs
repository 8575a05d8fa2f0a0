//! CLI entrypoint for the `localcloud` binary.

use clap::Parser as _;

use localcloud_suite::cli::Cli;
use localcloud_suite::error::SuiteError;

#[tokio::main]
async fn main() {
    let invocation = Cli::parse();

    if let Err(report) = localcloud_suite::inner_main(invocation).await {
        let code = report
            .downcast_ref::<SuiteError>()
            .map_or(1, SuiteError::exit_code);
        eprintln!("Error: {report:?}");
        std::process::exit(code);
    }
}
