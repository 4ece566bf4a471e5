//! impyla-query - runs one SQL statement described by a JSON request.

use impyla_bridge::cli::Cli;
use impyla_bridge::config::QueryRequest;
use impyla_bridge::db::PostgresDriver;
use impyla_bridge::envelope::{parse_request, report_failure, write_response, EXIT_OK};
use impyla_bridge::error::{BridgeError, Result};
use impyla_bridge::logging;
use impyla_bridge::query::run_query;
use tracing::info;

fn main() {
    logging::init_stderr_logging();
    let cli = match Cli::parse_args() {
        Ok(cli) => cli,
        Err(e) => std::process::exit(report_failure(&e, false)),
    };

    let code = match run(&cli) {
        Ok(()) => EXIT_OK,
        Err(e) => report_failure(&e, cli.pretty),
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<()> {
    let input = cli.read_input()?;
    let mut request: QueryRequest = parse_request(&input)?;
    request.resolve()?;

    info!("Connecting to {}", request.connection.display_string());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| BridgeError::internal(format!("Failed to start runtime: {e}")))?;
    let response = runtime.block_on(run_query(&PostgresDriver::new(), &request));

    write_response(std::io::stdout().lock(), &response, cli.pretty)
}
