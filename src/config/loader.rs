//! Configuration discovery and loading

use std::path::{Path, PathBuf};

use crate::error::{BuildError, BuildResult};

use super::types::{BuilderConfig, ConfigFile};

/// Looked up in the working directory when `--config` is not given
pub const CONFIG_FILE: &str = "phpinclude.toml";

/// `development` turns on diagnostics mode
pub const ENV_VAR: &str = "PHPINCLUDE_ENV";

/// Keys `phpinclude.toml` understands, for suggestions
const KNOWN_KEYS: &[&str] = &["extensions", "loaders", "name", "command"];

/// Read and validate a configuration file
pub fn load(path: &Path) -> BuildResult<ConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|source| BuildError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content, path)
}

/// Parse configuration text; unknown keys are an error
pub fn parse(content: &str, file: &Path) -> BuildResult<ConfigFile> {
    let mut unknown: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(content);
    let config: ConfigFile = serde_ignored::deserialize(deserializer, |path| {
        unknown.push(path.to_string());
    })
    .map_err(|e| BuildError::InvalidConfig {
        file: file.to_path_buf(),
        message: e.to_string().trim().to_string(),
    })?;

    if !unknown.is_empty() {
        let keys = unknown
            .into_iter()
            .map(|path| {
                let key = path.split('.').next_back().unwrap_or(path.as_str());
                match suggest_key(key) {
                    Some(suggestion) => format!("{} (did you mean `{}`?)", path, suggestion),
                    None => path,
                }
            })
            .collect();
        return Err(BuildError::UnknownConfigKeys {
            file: file.to_path_buf(),
            keys,
        });
    }
    Ok(config)
}

/// Configuration file to use, if any
pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let default = cwd.join(CONFIG_FILE);
    default.is_file().then_some(default)
}

/// Whether the environment asks for diagnostics mode
pub fn diagnostics_from_env() -> bool {
    std::env::var(ENV_VAR)
        .map(|value| value.eq_ignore_ascii_case("development"))
        .unwrap_or(false)
}

/// Builder settings from the discovered file, or defaults
pub fn load_builder_config(
    explicit: Option<&Path>,
    cwd: &Path,
    diagnostics: bool,
) -> BuildResult<BuilderConfig> {
    match discover(explicit, cwd) {
        Some(path) => load(&path)?.into_builder_config(&path, diagnostics),
        None => Ok(BuilderConfig::new().diagnostics(diagnostics)),
    }
}

fn suggest_key(unknown: &str) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for candidate in KNOWN_KEYS {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = if ac == bc { 0 } else { 1 };
            curr[j + 1] =
                std::cmp::min(std::cmp::min(prev[j + 1] + 1, curr[j] + 1), prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b_bytes.len()]
}
