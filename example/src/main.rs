use std::io;

use dry_stencil::{EngineConfig, Processor, VariableCollection};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod test;

const DESCRIPTOR: &str = include_str!("../templates/stencil.json");
const TEMPLATE: &str = include_str!("../templates/Cargo.toml.in");

fn processor(name: &str, kind: &str) -> Result<Processor, Box<dyn std::error::Error>> {
    let config: EngineConfig = serde_json::from_str(DESCRIPTOR)?;
    let variables: VariableCollection = [("name", name), ("version", "0.1.0"), ("kind", kind)]
        .into_iter()
        .collect();
    Ok(Processor::new(config, variables)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    for (name, kind) in [("Greeter", "bin"), ("Greeter-Derive", "proc-macro"), ("Greeter-Core", "lib")] {
        let processor = processor(name, kind)?;
        let (manifest, modified) = processor.process_str(TEMPLATE)?;
        info!(name, kind, modified, "rendered manifest");
        println!("{}", manifest);
    }
    Ok(())
}
