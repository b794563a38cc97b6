use anyhow::Context;
use std::path::PathBuf;
use suitehost_core::persistence::RegistryFile;
use suitehost_core::HostConfig;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::var_os("SUITEHOST_CONFIG") {
        Some(path) => HostConfig::load(&PathBuf::from(path))?,
        None => HostConfig::default(),
    };
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or(config.registry_path.clone())
        .context("usage: suitehost <registry-file>")?;

    let snapshot = RegistryFile::load(&path)?;
    println!("{}: {} persisted entries", config.host_name, snapshot.persisted.len());
    for (key, values) in &snapshot.persisted {
        println!("  {key}: {} keys", values.len());
    }

    Ok(())
}
