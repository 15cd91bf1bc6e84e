//! Process-wide defaults for list caching and the handshake adapter.

use std::sync::RwLock;

use once_cell::sync::Lazy;

static CURRENT: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::from_env()));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Whether new lists memoize `cell_at` lookups by offset. Turning this off trades
    /// O(1) re-access for O(n) walks and keeps visited prefixes collectable.
    pub cache_refs: bool,

    /// Stack size for handshake producer threads; `None` uses the platform default.
    pub worker_stack_size: Option<usize>,

    /// Thread name given to handshake producer threads.
    pub worker_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_refs: true,
            worker_stack_size: None,
            worker_name: "lazylist-producer".to_string(),
        }
    }
}

impl Config {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `LAZYLIST_CACHE_REFS`: `0`/`false`/`off` disables the index cache
    /// - `LAZYLIST_WORKER_STACK_SIZE`: producer thread stack size in bytes
    /// - `LAZYLIST_WORKER_NAME`: producer thread name
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("LAZYLIST_CACHE_REFS") {
            if let Some(v) = parse_flag(&s) {
                cfg.cache_refs = v;
            }
        }

        if let Ok(s) = std::env::var("LAZYLIST_WORKER_STACK_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.worker_stack_size = Some(v);
            }
        }

        if let Ok(s) = std::env::var("LAZYLIST_WORKER_NAME") {
            if !s.trim().is_empty() {
                cfg.worker_name = s.trim().to_string();
            }
        }

        cfg
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Snapshot of the process-wide config.
pub fn current() -> Config {
    CURRENT
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Replace the process-wide config, returning the previous one.
pub fn set(config: Config) -> Config {
    let mut guard = CURRENT
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    std::mem::replace(&mut *guard, config)
}

/// Default used when a list first builds its index cache.
pub(crate) fn cache_refs_default() -> bool {
    CURRENT
        .read()
        .map(|cfg| cfg.cache_refs)
        .unwrap_or_else(|poisoned| poisoned.into_inner().cache_refs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(cfg.cache_refs);
        assert_eq!(cfg.worker_stack_size, None);
        assert_eq!(cfg.worker_name, "lazylist-producer");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag(" Off "), Some(false));
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("maybe"), None);
    }
}
