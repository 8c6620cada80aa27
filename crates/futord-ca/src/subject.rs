//! Certificate subjects and the configured fields interpolated into them.

use std::collections::BTreeMap;
use std::fmt;

use rcgen::{DistinguishedName, DnType};
use serde::{Deserialize, Serialize};

use crate::{CaError, Result};

/// Organization of every root authority.
pub const ROOT_ORGANIZATION: &str = "futorcap.futord";

/// Common name of every root authority.
pub const ROOT_COMMON_NAME: &str = "Futord Root";

/// Default organization of issued key pairs.
pub const ISSUED_ORGANIZATION: &str = "Futorcap";

/// Field holding the issuing instance's name.
pub const INSTANCE_NAME_FIELD: &str = "instance_name";

/// Used when neither the fields nor the host name give an instance name.
const FALLBACK_INSTANCE_NAME: &str = "futord";

/// Caller-supplied key/value pairs. Unknown keys are carried but ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfiguredFields(BTreeMap<String, String>);

impl ConfiguredFields {
    /// Create an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Overlay `other` on top of these fields.
    pub fn merge(&mut self, other: &Self) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// The issuing instance's name.
    ///
    /// Falls back to the host name when `instance_name` is not configured.
    pub fn instance_name(&self) -> String {
        self.get(INSTANCE_NAME_FIELD)
            .filter(|s| !s.is_empty())
            .map_or_else(default_instance_name, str::to_string)
    }

    /// Iterate over all fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Resolve a field for template interpolation.
    fn resolve(&self, key: &str) -> Option<String> {
        if key == INSTANCE_NAME_FIELD {
            return Some(self.instance_name());
        }
        self.get(key).map(str::to_string)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfiguredFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn default_instance_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| FALLBACK_INSTANCE_NAME.to_string())
}

/// Distinguished name fields carried by every certificate we produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectName {
    /// O
    pub organization: String,
    /// OU, the issuing instance
    pub organizational_unit: String,
    /// CN
    pub common_name: String,
}

impl SubjectName {
    /// Convert to an rcgen distinguished name.
    pub fn to_distinguished_name(&self) -> DistinguishedName {
        let mut dn = DistinguishedName::new();
        dn.push(DnType::OrganizationName, self.organization.as_str());
        dn.push(
            DnType::OrganizationalUnitName,
            self.organizational_unit.as_str(),
        );
        dn.push(DnType::CommonName, self.common_name.as_str());
        dn
    }
}

impl fmt::Display for SubjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "O={}, OU={}, CN={}",
            self.organization, self.organizational_unit, self.common_name
        )
    }
}

/// Template for the subject of issued signing requests.
///
/// Values may reference configured fields as `{field}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectTemplate {
    /// Organization of issued certificates.
    #[serde(default = "default_organization")]
    pub organization: String,

    /// Organizational unit of both root and issued certificates.
    #[serde(default = "default_organizational_unit")]
    pub organizational_unit: String,
}

impl Default for SubjectTemplate {
    fn default() -> Self {
        Self {
            organization: default_organization(),
            organizational_unit: default_organizational_unit(),
        }
    }
}

impl SubjectTemplate {
    /// Subject of the root authority.
    pub fn root_subject(&self, fields: &ConfiguredFields) -> Result<SubjectName> {
        Ok(SubjectName {
            organization: ROOT_ORGANIZATION.to_string(),
            organizational_unit: interpolate(&self.organizational_unit, fields)?,
            common_name: ROOT_COMMON_NAME.to_string(),
        })
    }

    /// Subject of an issued key pair named `common_name`.
    pub fn issued_subject(&self, fields: &ConfiguredFields, common_name: &str) -> Result<SubjectName> {
        Ok(SubjectName {
            organization: interpolate(&self.organization, fields)?,
            organizational_unit: interpolate(&self.organizational_unit, fields)?,
            common_name: common_name.to_string(),
        })
    }
}

fn default_organization() -> String {
    ISSUED_ORGANIZATION.to_string()
}

fn default_organizational_unit() -> String {
    format!("{{{INSTANCE_NAME_FIELD}}}")
}

/// Replace every `{field}` in `template` with its configured value.
pub fn interpolate(template: &str, fields: &ConfiguredFields) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| {
            CaError::Argument(format!("unterminated placeholder in template {template:?}"))
        })?;
        let key = &after[..close];
        let value = fields.resolve(key).ok_or_else(|| {
            CaError::Argument(format!("template {template:?} references unset field {key:?}"))
        })?;
        out.push_str(&value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> ConfiguredFields {
        ConfiguredFields::new()
            .with("instance_name", "alpha")
            .with("region", "eu")
    }

    #[test]
    fn default_template_matches_issuance_subject() {
        let subject = SubjectTemplate::default()
            .issued_subject(&fields(), "2099-01-01_00-00-00_UTC.pub")
            .unwrap();
        assert_eq!(subject.organization, "Futorcap");
        assert_eq!(subject.organizational_unit, "alpha");
        assert_eq!(subject.common_name, "2099-01-01_00-00-00_UTC.pub");
    }

    #[test]
    fn root_subject_is_fixed_apart_from_instance() {
        let subject = SubjectTemplate::default().root_subject(&fields()).unwrap();
        assert_eq!(subject.organization, ROOT_ORGANIZATION);
        assert_eq!(subject.organizational_unit, "alpha");
        assert_eq!(subject.common_name, ROOT_COMMON_NAME);
    }

    #[test]
    fn interpolates_arbitrary_fields() {
        let out = interpolate("{instance_name}-{region}", &fields()).unwrap();
        assert_eq!(out, "alpha-eu");
        assert_eq!(interpolate("plain", &fields()).unwrap(), "plain");
    }

    #[test]
    fn unset_field_is_an_argument_error() {
        let err = interpolate("{missing}", &fields()).unwrap_err();
        assert!(err.is_argument());
        assert!(interpolate("{instance_name", &fields()).unwrap_err().is_argument());
    }

    #[test]
    fn instance_name_falls_back_when_unset() {
        let name = ConfiguredFields::new().instance_name();
        assert!(!name.is_empty());
    }

    #[test]
    fn template_deserializes_with_defaults() {
        let t: SubjectTemplate = toml::from_str("organization = \"Acme\"").unwrap();
        assert_eq!(t.organization, "Acme");
        assert_eq!(t.organizational_unit, "{instance_name}");
    }
}
