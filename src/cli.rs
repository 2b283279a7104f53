use crate::config::ConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliArgs {
    pub scene: Option<String>,
    pub config: Option<String>,
    pub steps: Option<usize>,
    pub fixed_hz: Option<f32>,
}

impl CliArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = CliArgs::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            if !flag.starts_with("--") {
                bail!("Unexpected argument '{flag}'. Use --scene/--config/--steps/--hz with values.");
            }
            let key = &flag[2..];
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "scene" => parsed.scene = Some(value),
                "config" => parsed.config = Some(value),
                "steps" => {
                    parsed.steps =
                        Some(value.parse::<usize>().with_context(|| format!("Invalid steps '{value}'"))?);
                }
                "hz" => {
                    parsed.fixed_hz =
                        Some(value.parse::<f32>().with_context(|| format!("Invalid hz '{value}'"))?);
                }
                _ => bail!("Unknown flag '{flag}'. Supported flags: --scene, --config, --steps, --hz."),
            }
        }
        Ok(parsed)
    }

    pub fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides { fixed_hz: self.fixed_hz, max_frame_time: None }
    }
}
