use docker_image_puller::cli::{Args, Runner};
use docker_image_puller::{PullerConfig, logging};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse_args();
    logging::init(args.verbose);

    let runner = Runner::new(args, PullerConfig::from_env());
    match runner.run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) if e.is_fatal() => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("Batch aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
