use hopgeo::address::parse_address;
use hopgeo::config::{parse_config, Config};
use hopgeo::provider::DESCRIPTORS;
use hopgeo::Resolver;

use serde_json::json;
use std::io::{BufRead, Write};
use std::path::Path;

const DEFAULT_CONFIG: &str = "hopgeo.toml";

fn print_providers() -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(
        stdout,
        "{:<14}{:<10}{:<8}{}",
        "NAME", "NETWORK", "TOKEN", "BASE_URI"
    )?;
    for descriptor in DESCRIPTORS {
        let yes_no = |flag: bool| if flag { "yes" } else { "no" };
        writeln!(
            stdout,
            "{:<14}{:<10}{:<8}{}",
            descriptor.name,
            yes_no(descriptor.requires_network),
            yes_no(descriptor.requires_token),
            yes_no(descriptor.base_uri_override),
        )?;
    }
    Ok(())
}

fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    match path {
        Some(path) => parse_config(path),
        None if Path::new(DEFAULT_CONFIG).exists() => parse_config(DEFAULT_CONFIG),
        None => Ok(Config::default()),
    }
}

fn resolve_line(resolver: &Resolver, ip: &str, out: &mut impl Write) -> anyhow::Result<()> {
    let line = match resolver.resolve(ip) {
        Ok(result) => json!({ "ip": ip, "result": result }),
        Err(error) => json!({ "ip": ip, "error": error.to_string() }),
    };
    writeln!(out, "{line}")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "--providers") {
        return print_providers();
    }

    // the first argument is the config file unless it is already an address
    let config_path = match args.first() {
        Some(first) if parse_address(first).is_none() => Some(args.remove(0)),
        _ => None,
    };
    let config = load_config(config_path.as_deref())?;

    simple_logger::init_with_level(config.log_level)?;

    let resolver = Resolver::from_config(config);

    let mut stdout = std::io::stdout().lock();
    if args.is_empty() {
        for line in std::io::stdin().lock().lines() {
            let line = line?;
            let ip = line.trim();
            if ip.is_empty() {
                continue;
            }
            resolve_line(&resolver, ip, &mut stdout)?;
        }
    } else {
        for ip in args.iter() {
            resolve_line(&resolver, ip, &mut stdout)?;
        }
    }
    Ok(())
}
