use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow,
  bail
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::datetime::resolve_timezone;
use crate::presentation::Presentation;

pub const CONFIG_ENV_VAR: &str =
  "SOULCAL_CONFIG";

#[derive(
  Debug, Clone, PartialEq, Serialize, Deserialize,
)]
#[serde(default)]
pub struct DisplayConfig {
  pub color: bool
}

impl Default for DisplayConfig {
  fn default() -> Self {
    Self { color: true }
  }
}

#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Serialize,
  Deserialize
)]
#[serde(default)]
pub struct Config {
  /// IANA zone naive event dates are
  /// read in.
  pub timezone:     Option<String>,
  pub display:      DisplayConfig,
  pub presentation: Presentation,
  #[serde(skip)]
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let path = resolve_config_path(
      config_override
    )?;

    let Some(path) = path else {
      warn!(
        "no config file found; using \
         defaults"
      );
      return Ok(Config::default());
    };

    info!(config = %path.display(), "loading config");
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    let mut cfg = Self::from_toml(&text)
      .with_context(|| {
        format!(
          "invalid config {}",
          path.display()
        )
      })?;
    cfg.loaded_files.push(path);
    Ok(cfg)
  }

  pub fn from_toml(
    text: &str
  ) -> anyhow::Result<Self> {
    let mut cfg: Config =
      toml::from_str(text)?;
    cfg.sanitize();
    Ok(cfg)
  }

  /// `key=value` pairs from the command
  /// line, applied after the file.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      debug!(key = %key, value = %value, "applying override");
      self
        .set(key.trim(), value.trim())
        .with_context(|| {
          format!(
            "invalid override \
             {key}={value}"
          )
        })?;
    }
    self.sanitize();
    Ok(())
  }

  fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    let p = &mut self.presentation;
    match key {
      | "timezone" => {
        self.timezone = (!value
          .is_empty())
        .then(|| value.to_string());
      }
      | "display.color" | "color" => {
        self.display.color =
          parse_bool(value)?;
      }
      | "presentation.viewport_height" => {
        p.viewport_height =
          parse_f64(value)?;
      }
      | "presentation.calendar_fraction" => {
        p.calendar_fraction =
          parse_f64(value)?;
      }
      | "presentation.header_height" => {
        p.header_height =
          parse_f64(value)?;
      }
      | "presentation.chrome_margin" => {
        p.chrome_margin =
          parse_f64(value)?;
      }
      | "presentation.top_padding" => {
        p.top_padding =
          parse_f64(value)?;
      }
      | "presentation.event_height" => {
        p.event_height =
          parse_f64(value)?;
      }
      | "presentation.min_event_height" => {
        p.min_event_height =
          parse_f64(value)?;
      }
      | "presentation.max_visible_lanes" => {
        p.max_visible_lanes = match value
        {
          | "" | "auto" => None,
          | raw => {
            Some(raw.parse().with_context(
              || {
                format!(
                  "expected a lane \
                   count, got {raw}"
                )
              }
            )?)
          }
        };
      }
      | other => {
        bail!("unknown config key: {other}")
      }
    }
    Ok(())
  }

  pub fn timezone(&self) -> Tz {
    resolve_timezone(
      self.timezone.as_deref()
    )
  }

  fn sanitize(&mut self) {
    let defaults =
      Presentation::default();
    let p = &mut self.presentation;

    if !p.viewport_height.is_finite()
      || p.viewport_height <= 0.0
    {
      p.viewport_height =
        defaults.viewport_height;
    }
    if !(p.calendar_fraction > 0.0
      && p.calendar_fraction <= 1.0)
    {
      p.calendar_fraction =
        defaults.calendar_fraction;
    }
    if !p.event_height.is_finite()
      || p.event_height <= 0.0
    {
      p.event_height =
        defaults.event_height;
    }
    for value in [
      &mut p.header_height,
      &mut p.chrome_margin,
      &mut p.top_padding,
      &mut p.min_event_height
    ] {
      if !value.is_finite()
        || *value < 0.0
      {
        *value = 0.0;
      }
    }

    if self
      .timezone
      .as_deref()
      .is_some_and(|tz| {
        tz.trim().is_empty()
      })
    {
      self.timezone = None;
    }
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(expand_tilde(path)));
  }

  if let Ok(env_path) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if env_path == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(expand_tilde(
      Path::new(&env_path)
    )));
  }

  if let Some(dir) = dirs::config_dir() {
    let candidate = dir
      .join("soulcal")
      .join("config.toml");
    if candidate.exists() {
      return Ok(Some(candidate));
    }
  }

  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  let candidate =
    home.join(".soulcal.toml");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(
  s: &str
) -> anyhow::Result<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Ok(true),
    | "0" | "n" | "no" | "off"
    | "false" => Ok(false),
    | other => {
      Err(anyhow!(
        "expected a boolean, got \
         {other}"
      ))
    }
  }
}

fn parse_f64(
  s: &str
) -> anyhow::Result<f64> {
  s.trim().parse::<f64>().with_context(
    || format!("expected a number, got {s}")
  )
}
