//! impyla-render - renders a SQL template described by a JSON request.

use impyla_bridge::cli::Cli;
use impyla_bridge::config::TemplateRequest;
use impyla_bridge::envelope::{parse_request, report_failure, write_response, EXIT_OK};
use impyla_bridge::error::Result;
use impyla_bridge::logging;
use impyla_bridge::plugins::PluginHost;
use impyla_bridge::template::render_template;

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
    let request: TemplateRequest = parse_request(&input)?;

    let plugins = PluginHost::new(request.base_dir()).load(&request.plugin_paths);
    let response = render_template(&request, &plugins);

    write_response(std::io::stdout().lock(), &response, cli.pretty)
}
