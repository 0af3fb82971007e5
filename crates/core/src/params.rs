//! Free-form request parameters.
//!
//! The query forms post a flat list of `name=value` pairs. Multi-valued
//! fields use the `name[]` convention; for everything else the last value
//! wins. Blank values are treated as absent.

use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    values: IndexMap<String, ParamValue>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect raw query-string pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.into();
            match key.strip_suffix("[]") {
                Some(name) => match params.values.get_mut(name) {
                    Some(ParamValue::Multi(values)) => values.push(value),
                    _ => {
                        params
                            .values
                            .insert(name.to_string(), ParamValue::Multi(vec![value]));
                    }
                },
                None => {
                    params
                        .values
                        .insert(key.to_string(), ParamValue::Single(value));
                }
            }
        }
        params
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.values
            .insert(name.to_string(), ParamValue::Single(value.into()));
        self
    }

    pub fn set_all<S: Into<String>>(
        &mut self,
        name: &str,
        values: impl IntoIterator<Item = S>,
    ) -> &mut Self {
        self.values.insert(
            name.to_string(),
            ParamValue::Multi(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Trimmed, non-empty single value. For a multi-valued field, its first
    /// value.
    pub fn get(&self, name: &str) -> Option<&str> {
        let raw = match self.values.get(name)? {
            ParamValue::Single(v) => v.as_str(),
            ParamValue::Multi(vs) => vs.first()?.as_str(),
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// All non-empty values of a field, whichever form it was sent in.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        match self.values.get(name) {
            Some(ParamValue::Single(v)) => {
                let v = v.trim();
                if v.is_empty() {
                    Vec::new()
                } else {
                    vec![v]
                }
            }
            Some(ParamValue::Multi(vs)) => vs
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }

    /// The first of `names` that carries a value, with the name it came from.
    pub fn first_of<'a>(&'a self, names: &[&'a str]) -> Option<(&'a str, &'a str)> {
        names
            .iter()
            .find_map(|name| self.get(name).map(|v| (*name, v)))
    }

    /// Checkbox semantics: `on`, `1`, `true` or `yes`.
    pub fn is_on(&self, name: &str) -> bool {
        matches!(
            self.get(name).map(str::to_ascii_lowercase).as_deref(),
            Some("on" | "1" | "true" | "yes")
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Parse an optional field, rejecting malformed values.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, CoreError> {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| CoreError::invalid(format!("{name} has an invalid value '{raw}'"))),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}
