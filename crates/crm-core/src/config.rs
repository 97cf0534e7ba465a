use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::str::FromStr;

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace
};

const CRMRC_ENV_VAR: &str = "CRMRC";

const DEFAULTS: [(&str, &str); 8] = [
  ("color", "on"),
  ("default.command", "dashboard"),
  ("view.clients", "list"),
  ("view.tasks", "list"),
  ("upcoming.days", "7"),
  ("upcoming.limit", "3"),
  ("tasks.transitions", "guarded"),
  ("seed", "on")
];

#[derive(Debug, Clone)]
pub struct Config {
  map: BTreeMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      map:          DEFAULTS
        .iter()
        .map(|(k, v)| {
          (k.to_string(), v.to_string())
        })
        .collect(),
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    crmrc_override
  ))]
  pub fn load(
    crmrc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let crmrc = resolve_crmrc_path(
      crmrc_override
    );
    if let Some(path) = crmrc {
      info!(crmrc = %path.display(), "loading crmrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no crmrc found; using \
         defaults"
      );
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

  /// Typed lookup; a missing key is
  /// `Ok(None)`, a malformed value is
  /// an error naming the key.
  pub fn get_parsed<T>(
    &self,
    key: &str
  ) -> anyhow::Result<Option<T>>
  where
    T: FromStr,
    T::Err: Display
  {
    let Some(raw) = self.map.get(key)
    else {
      return Ok(None);
    };
    raw
      .trim()
      .parse::<T>()
      .map(Some)
      .map_err(|err| {
        anyhow!(
          "invalid value for {key}: \
           {raw} ({err})"
        )
      })
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
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
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          tracing::warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

fn resolve_crmrc_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(crmrc_env) =
    std::env::var(CRMRC_ENV_VAR)
  {
    if crmrc_env == "/dev/null" {
      return None;
    }
    return Some(PathBuf::from(
      crmrc_env
    ));
  }

  let candidate =
    dirs::home_dir()?.join(".crmrc");
  candidate.exists().then_some(candidate)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
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

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::Config;
  use crate::task::TransitionPolicy;
  use crate::view::TaskView;

  #[test]
  fn defaults_are_present_without_a_file()
  {
    let cfg = Config::default();
    assert_eq!(
      cfg.get("default.command")
        .as_deref(),
      Some("dashboard")
    );
    assert_eq!(cfg.get_bool("seed"), Some(true));
    assert_eq!(
      cfg
        .get_parsed::<u64>("upcoming.days")
        .expect("parse days"),
      Some(7)
    );
  }

  #[test]
  fn loads_file_with_comments_and_includes()
  {
    let dir = tempdir().expect("tempdir");
    let extra = dir.path().join("views.rc");
    fs::write(
      &extra,
      "view.tasks = board\n"
    )
    .expect("write include");

    let main = dir.path().join("crmrc");
    fs::write(
      &main,
      "# crm settings\n\
       color = off   # plain output\n\
       include views.rc\n\
       include missing.rc\n\
       tasks.transitions=permissive\n"
    )
    .expect("write crmrc");

    let cfg = Config::load(Some(&main))
      .expect("load config");
    assert_eq!(cfg.loaded_files.len(), 2);
    assert_eq!(cfg.get_bool("color"), Some(false));
    assert_eq!(
      cfg
        .get_parsed::<TaskView>("view.tasks")
        .expect("parse view"),
      Some(TaskView::Board)
    );
    assert_eq!(
      cfg
        .get_parsed::<TransitionPolicy>(
          "tasks.transitions"
        )
        .expect("parse policy"),
      Some(TransitionPolicy::Permissive)
    );
  }

  #[test]
  fn rejects_lines_without_assignment() {
    let dir = tempdir().expect("tempdir");
    let main = dir.path().join("crmrc");
    fs::write(&main, "color on\n")
      .expect("write crmrc");
    let err = Config::load(Some(&main))
      .expect_err("invalid line");
    assert!(
      err.to_string().contains(":1:")
    );
  }

  #[test]
  fn overrides_strip_rc_prefix_and_win() {
    let mut cfg = Config::default();
    cfg.apply_overrides(vec![(
      "rc.upcoming.limit".to_string(),
      "5".to_string()
    )]);
    assert_eq!(
      cfg
        .get_parsed::<usize>("upcoming.limit")
        .expect("parse"),
      Some(5)
    );
  }

  #[test]
  fn malformed_typed_value_names_the_key()
  {
    let mut cfg = Config::default();
    cfg.apply_overrides(vec![(
      "upcoming.days".to_string(),
      "soon".to_string()
    )]);
    let err = cfg
      .get_parsed::<u64>("upcoming.days")
      .expect_err("bad number");
    assert!(
      err
        .to_string()
        .contains("upcoming.days")
    );
  }
}
