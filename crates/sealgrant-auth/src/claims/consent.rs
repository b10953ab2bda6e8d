//! Consent decisions and pre-resolved delivery claims.
//!
//! These values are decided when the authorization code is issued and then
//! ride inside every token derived from it, so the token and userinfo
//! endpoints can build responses without resolving attributes again.

use serde_json::{Map, Value};

/// Attribute names that could be released, and those the user approved.
///
/// Both lists keep the order in which they were decided.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsentClaims {
    /// Attributes the client asked for and that were eligible for release.
    pub consentable: Vec<String>,

    /// Attributes the end-user approved.
    pub consented: Vec<String>,
}

impl ConsentClaims {
    #[must_use]
    pub fn new(consentable: Vec<String>, consented: Vec<String>) -> Self {
        Self {
            consentable,
            consented,
        }
    }

    /// Returns `true` if the user approved releasing `claim`.
    #[must_use]
    pub fn is_consented(&self, claim: &str) -> bool {
        self.consented.iter().any(|c| c == claim)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.consentable.is_empty() && self.consented.is_empty()
    }
}

/// Attribute values resolved at authorization time.
///
/// Three independent bags: `general` values go to either surface,
/// `id_token` values only into ID tokens, `userinfo` values only into
/// userinfo responses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryClaims {
    pub general: Map<String, Value>,
    pub id_token: Map<String, Value>,
    pub userinfo: Map<String, Value>,
}

impl DeliveryClaims {
    #[must_use]
    pub fn new(
        general: Map<String, Value>,
        id_token: Map<String, Value>,
        userinfo: Map<String, Value>,
    ) -> Self {
        Self {
            general,
            id_token,
            userinfo,
        }
    }

    /// Claims to place in an ID token. ID-token values win over general ones.
    #[must_use]
    pub fn for_id_token(&self) -> Map<String, Value> {
        merge(&self.general, &self.id_token)
    }

    /// Claims to return from userinfo. Userinfo values win over general ones.
    #[must_use]
    pub fn for_userinfo(&self) -> Map<String, Value> {
        merge(&self.general, &self.userinfo)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.general.is_empty() && self.id_token.is_empty() && self.userinfo.is_empty()
    }
}

fn merge(base: &Map<String, Value>, specific: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (name, value) in specific {
        merged.insert(name.clone(), value.clone());
    }
    merged
}
