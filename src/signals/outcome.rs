//! Explicit result of a signal fetch.

use serde::Serialize;

/// Success, absence, or failure of one upstream signal.
///
/// `NoData` means the provider answered but had nothing meaningful (no
/// cloud-free imagery, every reading was a fill value). `Failed` carries the
/// reason of a network/service error or timeout. Both are cached like values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SignalOutcome<T> {
    Value(T),
    NoData,
    Failed(String),
}

impl<T> SignalOutcome<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            SignalOutcome::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            SignalOutcome::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The value, or the scorer's safe default.
    pub fn value_or(self, default: T) -> T {
        self.into_value().unwrap_or(default)
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> SignalOutcome<U> {
        match self {
            SignalOutcome::Value(v) => SignalOutcome::Value(f(v)),
            SignalOutcome::NoData => SignalOutcome::NoData,
            SignalOutcome::Failed(reason) => SignalOutcome::Failed(reason),
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SignalOutcome::Value(_) => "value",
            SignalOutcome::NoData => "no_data",
            SignalOutcome::Failed(_) => "failed",
        }
    }
}

impl<T> From<Option<T>> for SignalOutcome<T> {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => SignalOutcome::Value(v),
            None => SignalOutcome::NoData,
        }
    }
}
