//! Distinguished-name fields shared by every certificate in the hierarchy.
//!
//! Leaf certificates inherit all of these from the intermediate certificate
//! except the common name, which becomes the server's fully-qualified name.

use anyhow::{anyhow, Result};
use openssl::nid::Nid;
use openssl::x509::{X509Name, X509NameRef};
use std::fmt;

/// Subject fields in the order they are written into an `X509Name`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Subject {
    pub country: String,
    pub state: String,
    pub locality: String,
    pub organization: String,
    pub organizational_unit: String,
    pub common_name: String,
    pub email: String,
}

impl Subject {
    fn entries(&self) -> [(Nid, &str, &'static str); 7] {
        [
            (Nid::COUNTRYNAME, self.country.as_str(), "C"),
            (Nid::STATEORPROVINCENAME, self.state.as_str(), "ST"),
            (Nid::LOCALITYNAME, self.locality.as_str(), "L"),
            (Nid::ORGANIZATIONNAME, self.organization.as_str(), "O"),
            (Nid::ORGANIZATIONALUNITNAME, self.organizational_unit.as_str(), "OU"),
            (Nid::COMMONNAME, self.common_name.as_str(), "CN"),
            (Nid::PKCS9_EMAILADDRESS, self.email.as_str(), "emailAddress"),
        ]
    }

    /// Build an `X509Name`. Empty fields are left out; the common name is required.
    pub fn to_x509_name(&self) -> Result<X509Name> {
        if self.common_name.trim().is_empty() {
            return Err(anyhow!("Subject common name must not be empty"));
        }

        let mut name_builder =
            X509Name::builder().map_err(|e| anyhow!("Failed to create name builder: {}", e))?;
        for (nid, value, label) in self.entries() {
            if value.is_empty() {
                continue;
            }
            name_builder
                .append_entry_by_nid(nid, value)
                .map_err(|e| anyhow!("Failed to set {}: {}", label, e))?;
        }
        Ok(name_builder.build())
    }

    /// Read the subject fields back out of a certificate or CSR name.
    /// Absent fields come back empty.
    pub fn from_x509_name(name: &X509NameRef) -> Result<Self> {
        Ok(Self {
            country: entry(name, Nid::COUNTRYNAME)?,
            state: entry(name, Nid::STATEORPROVINCENAME)?,
            locality: entry(name, Nid::LOCALITYNAME)?,
            organization: entry(name, Nid::ORGANIZATIONNAME)?,
            organizational_unit: entry(name, Nid::ORGANIZATIONALUNITNAME)?,
            common_name: entry(name, Nid::COMMONNAME)?,
            email: entry(name, Nid::PKCS9_EMAILADDRESS)?,
        })
    }

    /// Same subject with the common name replaced.
    pub fn with_common_name(&self, common_name: &str) -> Self {
        Self {
            common_name: common_name.to_string(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (_, value, label) in self.entries() {
            if value.is_empty() {
                continue;
            }
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", label, value)?;
            first = false;
        }
        Ok(())
    }
}

fn entry(name: &X509NameRef, nid: Nid) -> Result<String> {
    match name.entries_by_nid(nid).next() {
        Some(e) => {
            e.data()
                .to_string()
                .map_err(|err| anyhow!("Failed to decode {:?} entry: {}", nid, err))
        }
        None => Ok(String::new()),
    }
}

/// One-line rendering of any name, including attributes `Subject` does not model.
pub fn describe_name(name: &X509NameRef) -> String {
    name.entries()
        .map(|e| {
            let key = e.object().nid().short_name().unwrap_or("?");
            let value = e
                .data()
                .to_string()
                .unwrap_or_else(|_| "<undecodable>".to_string());
            format!("{}={}", key, value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}
