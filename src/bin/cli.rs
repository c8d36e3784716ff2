use anyhow::{anyhow, bail, Context, Result};
use camera_explorer::parameter::SnapshotDetail;
use camera_explorer::{
    testing, CameraParameter, CameraSession, DeviceProfile, ExplorerConfig, ParameterSnapshot,
    SharedDevice, SimulatedDevice,
};
use std::env;
use std::path::Path;

const USAGE: &str = "Usage: camera-explorer-cli <command> [args]

Commands:
  list <profile> [--json]                   Show the settings the device offers
  set <profile> <parameter> <value> [--json] Change one setting by label or number
  reset <profile> [--json]                  Apply every default and show the result
  write-profile <path> [name]               Save a built-in profile as TOML

<profile> is a TOML file or one of the built-in names: full, fixed-ranges, front.
Pass --config <path> to use a configuration other than camera-explorer.toml.";

#[tokio::main]
async fn main() -> Result<()> {
    camera_explorer::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    let json = args.iter().any(|a| a == "--json");
    let config = load_config(&args)?;
    let positional = positional_args(&args[2..]);

    let command = &args[1];
    match command.as_str() {
        "list" => cmd_list(&positional, &config, json).await,
        "set" => cmd_set(&positional, &config, json).await,
        "reset" => cmd_reset(&positional, &config, json).await,
        "write-profile" => cmd_write_profile(&positional),
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}\n\n{}", command, USAGE);
            std::process::exit(1);
        }
    }
}

/// Arguments after the command, without flags and flag values.
fn positional_args(args: &[String]) -> Vec<String> {
    let mut positional = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--json" => {}
            "--config" => i += 1,
            other => positional.push(other.to_string()),
        }
        i += 1;
    }
    positional
}

fn load_config(args: &[String]) -> Result<ExplorerConfig> {
    match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = args.get(i + 1).ok_or_else(|| anyhow!("--config needs a path"))?;
            Ok(ExplorerConfig::load_from_file(path)?)
        }
        None => Ok(ExplorerConfig::load_or_default()),
    }
}

fn load_profile(source: &str) -> Result<DeviceProfile> {
    if Path::new(source).is_file() {
        return DeviceProfile::load_from_file(source)
            .with_context(|| format!("loading device profile {}", source));
    }
    testing::profile(source).ok_or_else(|| anyhow!("No profile file or built-in profile named '{}'", source))
}

async fn open_session(source: &str, config: &ExplorerConfig) -> Result<CameraSession> {
    let profile = load_profile(source)?;
    let device = SharedDevice::new(SimulatedDevice::from_profile(&profile));
    Ok(CameraSession::open(device, config.clone()).await?)
}

fn print_snapshots(snapshots: &[ParameterSnapshot], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshots)?);
        return Ok(());
    }
    for snapshot in snapshots {
        println!("{}", describe(snapshot));
    }
    Ok(())
}

fn describe(snapshot: &ParameterSnapshot) -> String {
    match &snapshot.detail {
        SnapshotDetail::Range {
            minimum,
            maximum,
            value,
        } => format!("{}: {} ({}..={})", snapshot.name, value, minimum, maximum),
        SnapshotDetail::Enumerated { options, selected } => {
            let labels: Vec<String> = options
                .iter()
                .enumerate()
                .map(|(i, o)| {
                    if Some(i) == *selected {
                        format!("[{}]", o.label)
                    } else {
                        o.label.clone()
                    }
                })
                .collect();
            format!("{}: {}", snapshot.name, labels.join(", "))
        }
    }
}

async fn cmd_list(args: &[String], config: &ExplorerConfig, json: bool) -> Result<()> {
    let Some(source) = args.first() else {
        bail!("Usage: camera-explorer-cli list <profile> [--json]");
    };
    let session = open_session(source, config).await?;
    print_snapshots(&session.snapshot()?, json)
}

async fn cmd_set(args: &[String], config: &ExplorerConfig, json: bool) -> Result<()> {
    if args.len() < 3 {
        bail!("Usage: camera-explorer-cli set <profile> <parameter> <value>");
    }
    let session = open_session(&args[0], config).await?;
    let parameter = session
        .parameter(&args[1])?
        .ok_or_else(|| anyhow!("'{}' is not available on this device", args[1]))?;

    apply(parameter.as_ref(), &args[2]).await?;
    print_snapshots(&[parameter.snapshot()], json)
}

async fn apply(parameter: &dyn CameraParameter, input: &str) -> Result<()> {
    let outcome = if let Some(range) = parameter.as_range() {
        let value: i64 = input
            .parse()
            .with_context(|| format!("{} takes a number", parameter.name()))?;
        range.set_value(value)?
    } else if let Some(enumerated) = parameter.as_enumerated() {
        let index = enumerated.index_of_label(input).ok_or_else(|| {
            anyhow!(
                "'{}' is not an option of {} (expected one of: {})",
                input,
                parameter.name(),
                enumerated.option_labels().join(", ")
            )
        })?;
        enumerated.select_index(Some(index))?
    } else {
        bail!("{} cannot be set", parameter.name());
    };
    outcome.settle().await?;
    Ok(())
}

async fn cmd_reset(args: &[String], config: &ExplorerConfig, json: bool) -> Result<()> {
    let Some(source) = args.first() else {
        bail!("Usage: camera-explorer-cli reset <profile> [--json]");
    };
    let session = open_session(source, config).await?;
    for failure in session.reset_all().await? {
        eprintln!("warning: {}", failure);
    }
    print_snapshots(&session.snapshot()?, json)
}

fn cmd_write_profile(args: &[String]) -> Result<()> {
    let Some(path) = args.first() else {
        bail!("Usage: camera-explorer-cli write-profile <path> [name]");
    };
    let name = args.get(1).map(String::as_str).unwrap_or("full");
    let profile = testing::profile(name).ok_or_else(|| anyhow!("No built-in profile named '{}'", name))?;
    profile.save_to_file(path)?;
    println!("Wrote profile '{}' to {}", name, path);
    Ok(())
}
