//! Cache-aware lookup results

/// Whether a value was served from the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Value of the `X-Cache-Status` response header.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gateway result together with its cache outcome.
#[derive(Debug, Clone)]
pub struct Lookup<T> {
    pub value: T,
    pub cache: CacheStatus,
}

impl<T> Lookup<T> {
    pub fn hit(value: T) -> Self {
        Self {
            value,
            cache: CacheStatus::Hit,
        }
    }

    pub fn miss(value: T) -> Self {
        Self {
            value,
            cache: CacheStatus::Miss,
        }
    }
}
