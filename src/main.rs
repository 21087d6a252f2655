//! Command line entrypoint: record scores and print rankings.
//!
//! ```sh
//! RANKBOARD_BACKEND=sqlite rankboard add user_42 5
//! RANKBOARD_BACKEND=sqlite rankboard top week
//! RANKBOARD_BACKEND=sqlite rankboard top days:30 0 19
//! RANKBOARD_CONFIG=rankboard.json rankboard top month
//! ```

use std::process::ExitCode;

use rankboard::ranking::{RankWindow, RankingConfig, RankingEngine, RankingError, RankingResult, open_store};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: rankboard add <identity> [delta] | rankboard top <yesterday|week|month|days:N|YYYYMMDD> [start stop]";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) if e.is_invalid_argument() => {
            error!("{e}");
            eprintln!("{USAGE}");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(1)
        }
    }
}

fn run(args: &[String]) -> RankingResult<String> {
    let Some((command, rest)) = args.split_first() else {
        return Err(RankingError::InvalidArgument("missing command".to_string()));
    };

    let config = RankingConfig::load()?;
    let store = open_store(&config.storage)?;
    let engine = RankingEngine::from_config(&config, store)?;
    info!("Namespace: {}", engine.namespace());

    match command.as_str() {
        "add" => {
            let identity = rest
                .first()
                .ok_or_else(|| RankingError::InvalidArgument("missing identity".to_string()))?;
            let delta = match rest.get(1) {
                Some(raw) => parse_int(raw, "delta")?,
                None => 1,
            };
            let score = engine.add_score(identity, delta)?;
            Ok(score.to_string())
        }
        "top" => {
            let window: RankWindow = rest
                .first()
                .ok_or_else(|| RankingError::InvalidArgument("missing window".to_string()))?
                .parse()?;
            let ranked = match (rest.get(1), rest.get(2)) {
                (Some(start), Some(stop)) => engine.top_window(
                    &window,
                    parse_int(start, "start")?,
                    parse_int(stop, "stop")?,
                )?,
                (None, None) => engine.top(&window)?,
                _ => {
                    return Err(RankingError::InvalidArgument(
                        "start and stop must be given together".to_string(),
                    ));
                }
            };
            Ok(serde_json::to_string_pretty(&ranked)?)
        }
        other => Err(RankingError::InvalidArgument(format!(
            "unknown command {other:?}"
        ))),
    }
}

fn parse_int(raw: &str, name: &str) -> RankingResult<i64> {
    raw.parse()
        .map_err(|e| RankingError::InvalidArgument(format!("invalid {name} {raw:?}: {e}")))
}
