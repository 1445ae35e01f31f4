use std::collections::BTreeMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::filter::Filter;

pub const RC_ENV_VAR: &str = "TODORC";
const RC_FILE_NAME: &str = ".todorc";
const DEFAULT_DATA_DIR: &str =
  "~/.todo-runner";

#[derive(Debug, Clone)]
pub struct Config {
  map: BTreeMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

#[derive(Debug, PartialEq, Eq)]
enum RcLine<'a> {
  Blank,
  Include(&'a str),
  Setting(&'a str, &'a str)
}

impl Default for Config {
  fn default() -> Self {
    let map = [
      (
        "data.location",
        DEFAULT_DATA_DIR
      ),
      ("default.command", "list"),
      ("default.filter", "all"),
      ("color", "on")
    ]
    .into_iter()
    .map(|(k, v)| {
      (k.to_string(), v.to_string())
    })
    .collect();

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    match resolve_rc_path(rc_override)?
    {
      | Some(path) => {
        info!(todorc = %path.display(), "loading todorc");
        cfg.load_file(&path)?;
      }
      | None => {
        debug!(
          "no todorc found; using \
           defaults"
        );
      }
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  pub fn default_filter(
    &self
  ) -> anyhow::Result<Filter> {
    self
      .get("default.filter")
      .as_deref()
      .unwrap_or("all")
      .parse::<Filter>()
      .context(
        "invalid default.filter \
         setting"
      )
  }

  pub fn color_enabled(&self) -> bool {
    self.get_bool("color").unwrap_or(true)
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    if self.loaded_files.contains(&path)
    {
      warn!(file = %path.display(), "todorc already loaded; skipping include cycle");
      return Ok(());
    }

    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (idx, raw_line) in
      text.lines().enumerate()
    {
      let line_num = idx + 1;
      match parse_rc_line(raw_line) {
        | Some(RcLine::Blank) => {}
        | Some(RcLine::Include(rest)) => {
          let include_path =
            resolve_include_path(
              &base_dir, rest
            )?;
          debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num,
            "processing include"
          );
          if include_path.exists() {
            self
              .load_file(&include_path)?;
          } else {
            warn!(include = %include_path.display(), "include file does not exist; skipping");
          }
        }
        | Some(RcLine::Setting(
          key,
          value
        )) => {
          trace!(key, value, "loaded config key");
          self.map.insert(
            key.to_string(),
            value.to_string()
          );
        }
        | None => {
          return Err(anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num,
            raw_line
          ));
        }
      }
    }

    Ok(())
  }
}

fn parse_rc_line(
  raw: &str
) -> Option<RcLine<'_>> {
  let line = raw
    .split_once('#')
    .map_or(raw, |(before, _)| before)
    .trim();
  if line.is_empty() {
    return Some(RcLine::Blank);
  }

  if let Some(rest) =
    line.strip_prefix("include ")
  {
    return Some(RcLine::Include(
      rest.trim()
    ));
  }

  let (k, v) = line.split_once('=')?;
  let key = k.trim();
  if key.is_empty() {
    return None;
  }
  Some(RcLine::Setting(key, v.trim()))
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping todorc"
    );
    return Ok(None);
  };
  let candidate =
    home.join(RC_FILE_NAME);
  Ok(candidate
    .exists()
    .then_some(candidate))
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(".todo-runner"))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let expanded =
    expand_tilde(Path::new(include));
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
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

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
