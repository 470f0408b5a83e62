#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_STORAGE_DIR: &str = ".memgate";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Toolset {
    /// Consolidated tools plus every legacy endpoint.
    Full,
    /// Consolidated tools only.
    Core,
}

impl Toolset {
    pub(crate) fn from_str(value: &str) -> Option<Self> {
        match value {
            "full" | "legacy" => Some(Self::Full),
            "core" | "minimal" => Some(Self::Core),
            _ => None,
        }
    }

    pub(crate) fn parse(value: Option<&str>) -> Self {
        value.and_then(Self::from_str).unwrap_or(Self::Full)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Core => "core",
        }
    }

    pub(crate) fn legacy_enabled(self) -> bool {
        matches!(self, Self::Full)
    }
}

fn flag_value(flag: &str) -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg.as_str() == flag
            && let Some(value) = args.next()
        {
            return Some(value);
        }
        if let Some(value) = arg
            .strip_prefix(flag)
            .and_then(|rest| rest.strip_prefix('='))
        {
            return Some(value.to_string());
        }
    }
    None
}

fn flag_or_env(flag: &str, env: &str) -> Option<String> {
    flag_value(flag).or_else(|| {
        std::env::var(env)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

pub(crate) fn parse_storage_dir() -> PathBuf {
    flag_or_env("--storage-dir", "MEMGATE_STORAGE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR))
}

pub(crate) fn parse_toolset() -> Toolset {
    Toolset::parse(flag_or_env("--toolset", "MEMGATE_TOOLSET").as_deref())
}

/// Zero or an unparsable value disables the deadline.
pub(crate) fn parse_call_timeout() -> Option<Duration> {
    flag_or_env("--call-timeout-ms", "MEMGATE_CALL_TIMEOUT_MS")
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

pub(crate) fn parse_log_filter() -> Option<String> {
    flag_or_env("--log", "MEMGATE_LOG")
}

#[cfg(test)]
mod tests {
    use super::Toolset;

    #[test]
    fn toolset_parse_defaults_to_full() {
        assert_eq!(Toolset::parse(None), Toolset::Full);
        assert_eq!(Toolset::parse(Some("bogus")), Toolset::Full);
        assert_eq!(Toolset::parse(Some("core")), Toolset::Core);
        assert!(!Toolset::Core.legacy_enabled());
        assert_eq!(Toolset::Full.as_str(), "full");
    }
}
