use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use mibtx_core::AgentUpTime;
use mibtx_engine::{change_key, encode_key_change, EngineConfig, KeyChangeAlgorithm};
use rand::RngCore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn protocol_arg() -> Arg {
    Arg::new("protocol")
        .long("protocol")
        .default_value("sha256")
        .value_parser(value_parser!(KeyChangeAlgorithm))
        .help("Authentication protocol: sha224, sha256, sha384 or sha512")
}

fn hex_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).required(true).help(help)
}

fn cli() -> Command {
    Command::new("mibtx")
        .version(mibtx_engine::VERSION)
        .about("SNMP SET transaction engine tools")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("check-config")
                .about("Load a configuration file and list the objects it defines")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("key-change")
                .about("Apply a key-change value to an old key (agent side)")
                .arg(protocol_arg())
                .arg(hex_arg("old-key", "Current localized key, hex"))
                .arg(hex_arg("key-change", "random || delta as sent by the manager, hex")),
        )
        .subcommand(
            Command::new("encode-key-change")
                .about("Build the key-change value moving old-key to new-key (manager side)")
                .arg(protocol_arg())
                .arg(hex_arg("old-key", "Current localized key, hex"))
                .arg(hex_arg("new-key", "Desired localized key, hex"))
                .arg(
                    Arg::new("random")
                        .long("random")
                        .help("Random component, hex; generated when omitted"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn hex_value(args: &ArgMatches, name: &str) -> Result<Vec<u8>> {
    let text = args
        .get_one::<String>(name)
        .with_context(|| format!("--{name} is required"))?;
    hex::decode(text).with_context(|| format!("--{name} is not valid hex"))
}

fn check_config(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<PathBuf>("path")
        .context("configuration path is required")?;
    let config = EngineConfig::load(path)?;
    let engine = config.build_engine(Arc::new(AgentUpTime::start()))?;

    if args.get_flag("json") {
        let objects: Vec<_> = config
            .objects
            .iter()
            .map(|object| serde_json::json!({ "oid": object.oid() }))
            .collect();
        let report = serde_json::json!({
            "max_bindings": engine.max_bindings(),
            "objects": objects,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Configuration OK: {}", path.display());
        println!("  Max bindings: {}", engine.max_bindings());
        println!("  Objects: {}", engine.store().len());
        for oid in engine.store().oids() {
            if let Some(object) = engine.store().resolve(&oid) {
                println!("    {} ({})", oid, object.lock().kind().name());
            }
        }
    }
    Ok(())
}

fn key_change(args: &ArgMatches) -> Result<()> {
    let algorithm = *args
        .get_one::<KeyChangeAlgorithm>("protocol")
        .context("--protocol is required")?;
    let protocol = algorithm.protocol();
    let old_key = hex_value(args, "old-key")?;
    let key_change = hex_value(args, "key-change")?;
    if old_key.len() != protocol.key_length() {
        bail!(
            "old key is {} bytes, {:?} needs {}",
            old_key.len(),
            algorithm,
            protocol.key_length()
        );
    }

    let rotation = change_key(protocol.as_ref(), &old_key, &key_change, protocol.key_length())?;
    println!("new key:  {}", hex::encode(&rotation.new_key));
    println!("reported: {}", hex::encode(&rotation.reported));
    Ok(())
}

fn encode(args: &ArgMatches) -> Result<()> {
    let algorithm = *args
        .get_one::<KeyChangeAlgorithm>("protocol")
        .context("--protocol is required")?;
    let protocol = algorithm.protocol();
    let key_length = protocol.key_length();
    let old_key = hex_value(args, "old-key")?;
    let new_key = hex_value(args, "new-key")?;
    for (name, key) in [("old", &old_key), ("new", &new_key)] {
        if key.len() != key_length {
            bail!("{name} key is {} bytes, {:?} needs {key_length}", key.len(), algorithm);
        }
    }

    let random = if args.contains_id("random") {
        hex_value(args, "random")?
    } else {
        let mut random = vec![0u8; key_length];
        rand::thread_rng().fill_bytes(&mut random);
        random
    };
    if random.len() != key_length {
        bail!("random is {} bytes, {:?} needs {key_length}", random.len(), algorithm);
    }

    let sent = encode_key_change(protocol.as_ref(), &old_key, &new_key, &random);
    println!("{}", hex::encode(sent));
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("check-config", args)) => check_config(args),
        Some(("key-change", args)) => key_change(args),
        Some(("encode-key-change", args)) => encode(args),
        Some((other, _)) => bail!("unknown subcommand {other}"),
        None => bail!("a subcommand is required"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn parses_encode_arguments() {
        let matches = cli()
            .try_get_matches_from([
                "mibtx",
                "encode-key-change",
                "--protocol",
                "sha384",
                "--old-key",
                "00",
                "--new-key",
                "11",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "encode-key-change");
        assert_eq!(
            args.get_one::<KeyChangeAlgorithm>("protocol"),
            Some(&KeyChangeAlgorithm::Sha384)
        );
        assert!(!args.contains_id("random"));
    }
}
