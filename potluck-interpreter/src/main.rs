use std::{borrow::Cow, env, fs, io, process};

use potluck_application::{EventDto, EventManager, EventMapper};
use potluck_domain::{SettlementEngine, SettlementTolerances};

type CliResult<T> = Result<T, Cow<'static, str>>;

const USAGE: &str = "Usage: potluck-interpreter <event.json> [--json]";

fn main() {
    let _ = dotenvy::dotenv();
    init_logging();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn run() -> CliResult<()> {
    let Some(path) = env::args().nth(1) else {
        return Err(USAGE.into());
    };
    let as_json = match env::args().nth(2).as_deref() {
        None => false,
        Some("--json") => true,
        Some(other) => return Err(format!("Unknown option '{other}'\n{USAGE}").into()),
    };

    let tolerances = SettlementTolerances::from_env().map_err(|err| err.to_string())?;
    tracing::debug!(
        removal = %tolerances.removal,
        classification_epsilon = %tolerances.classification_epsilon,
        "Settlement tolerances loaded"
    );

    let source =
        fs::read_to_string(&path).map_err(|err| format!("Failed to read '{path}': {err}"))?;
    let dto: EventDto = serde_json::from_str(&source)
        .map_err(|err| format!("'{path}' is not a valid event: {err}"))?;
    let event = EventMapper
        .to_domain(&dto)
        .map_err(|err| format!("'{path}': {err}"))?;

    let manager = EventManager::new(SettlementEngine::new(tolerances));
    let id = manager.insert_event(event);
    let report = manager.settle(id).map_err(|err| err.to_string())?;

    if as_json {
        let settled = manager.get(id).map_err(|err| err.to_string())?;
        let output = serde_json::to_string_pretty(&EventMapper.to_result(&settled))
            .map_err(|err| format!("Failed to serialize result: {err}"))?;
        println!("{output}");
    } else {
        print!("{report}");
    }

    Ok(())
}
