//! Request identities: the endpoint path plus canonicalized query parameters.

use std::collections::BTreeMap;
use std::fmt;

/// Query parameter carrying the provider credential. Never part of an identity.
pub const CREDENTIAL_PARAM: &str = "apiKey";

/// Canonical identity of an outbound query: endpoint path plus its parameters,
/// sorted by key, with the credential removed.
///
/// Two call sites that build the same parameters in a different order produce
/// equal identities and therefore share cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestIdentity {
    path: String,
    params: BTreeMap<String, String>,
}

impl RequestIdentity {
    pub fn new<I, K, V>(path: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k != CREDENTIAL_PARAM)
            .collect();
        Self {
            path: path.into(),
            params,
        }
    }

    /// An identity with no query parameters.
    pub fn path_only(path: impl Into<String>) -> Self {
        Self::new(path, std::iter::empty::<(String, String)>())
    }

    /// The endpoint path, relative to the provider base URL.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parameters in canonical (key-sorted) order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        let mut sep = '?';
        for (k, v) in &self.params {
            write!(f, "{sep}{k}={v}")?;
            sep = '&';
        }
        Ok(())
    }
}
