//! Tagged results for stages that may fall back instead of failing
//!
//! Embedding (primary provider → local fallback) and re-ranking (model → untouched
//! candidates) can both "succeed" in a lesser way. `StageResult` keeps that visible to
//! callers and tests instead of hiding it behind a plain `Ok`.

/// Outcome of a pipeline stage with an explicit degraded path
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult<T> {
    /// The stage ran as designed
    Ok(T),
    /// The stage produced a usable value through its fallback path
    Degraded(T, String),
    /// Neither the primary nor the fallback path produced a value
    Failed(String),
}

impl<T> StageResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, StageResult::Ok(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, StageResult::Degraded(..))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageResult::Failed(_))
    }

    /// Borrow the value, if any path produced one
    pub fn value(&self) -> Option<&T> {
        match self {
            StageResult::Ok(value) | StageResult::Degraded(value, _) => Some(value),
            StageResult::Failed(_) => None,
        }
    }

    /// Take the value, dropping the degradation reason
    pub fn into_value(self) -> Option<T> {
        match self {
            StageResult::Ok(value) | StageResult::Degraded(value, _) => Some(value),
            StageResult::Failed(_) => None,
        }
    }

    /// Reason attached to a degraded or failed result
    pub fn reason(&self) -> Option<&str> {
        match self {
            StageResult::Ok(_) => None,
            StageResult::Degraded(_, reason) | StageResult::Failed(reason) => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StageResult<U> {
        match self {
            StageResult::Ok(value) => StageResult::Ok(f(value)),
            StageResult::Degraded(value, reason) => StageResult::Degraded(f(value), reason),
            StageResult::Failed(reason) => StageResult::Failed(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_access() {
        let ok: StageResult<u32> = StageResult::Ok(1);
        let degraded: StageResult<u32> = StageResult::Degraded(2, "fallback".to_string());
        let failed: StageResult<u32> = StageResult::Failed("down".to_string());

        assert_eq!(ok.value(), Some(&1));
        assert_eq!(degraded.value(), Some(&2));
        assert_eq!(failed.value(), None);

        assert!(ok.reason().is_none());
        assert_eq!(degraded.reason(), Some("fallback"));
        assert_eq!(failed.reason(), Some("down"));
    }

    #[test]
    fn test_map_keeps_tag() {
        let degraded: StageResult<u32> = StageResult::Degraded(2, "fallback".to_string());
        let mapped = degraded.map(|v| v * 10);

        assert!(mapped.is_degraded());
        assert_eq!(mapped.into_value(), Some(20));
    }
}
