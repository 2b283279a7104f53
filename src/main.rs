use anyhow::{Context, Result};
use shrike_engine::cli::CliArgs;
use shrike_engine::config::RuntimeConfig;
use shrike_engine::runner::Runtime;

fn main() {
    let args = match CliArgs::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(args) {
        eprintln!("Runtime error: {err:?}");
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    config.apply_overrides(args.config_overrides());

    let scene = args
        .scene
        .clone()
        .context("Usage: shrike_engine --scene <scene.json> [--steps N] [--config file] [--hz N]")?;

    let mut runtime = Runtime::new(config)?;
    runtime.load_scene_file(&scene)?;

    let steps = args.steps.unwrap_or(600);
    runtime.run_steps(steps);

    for info in runtime.snapshot() {
        let velocity = info
            .velocity
            .map(|v| format!(" vel=({:.2}, {:.2})", v.x, v.y))
            .unwrap_or_default();
        println!(
            "{} pos=({:.2}, {:.2}) rot={:.1}{velocity}",
            info.name, info.translation.x, info.translation.y, info.rotation
        );
    }
    Ok(())
}
