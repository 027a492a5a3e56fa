//! Chain verification against a PEM bundle.

use anyhow::{anyhow, Result};
use openssl::pkey::{HasPublic, PKeyRef};
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509NameRef, X509Ref, X509StoreContext, X509VerifyResult, X509};

/// Outcome of verifying one certificate against a set of trust anchors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Invalid { reason: String, depth: u32 },
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid)
    }
}

/// Verify `certificate` against every certificate in `bundle`, treating all of
/// them as trusted. The chain must still terminate in a self-signed root.
pub fn verify_against_bundle(certificate: &X509Ref, bundle: &[X509]) -> Result<Verification> {
    let mut store_builder =
        X509StoreBuilder::new().map_err(|e| anyhow!("Failed to create X509 store: {}", e))?;
    for anchor in bundle {
        store_builder
            .add_cert(anchor.clone())
            .map_err(|e| anyhow!("Failed to add certificate to store: {}", e))?;
    }
    let store = store_builder.build();

    let chain: Stack<X509> = Stack::new()?;
    let mut context =
        X509StoreContext::new().map_err(|e| anyhow!("Failed to create store context: {}", e))?;
    let (verified, error, depth) = context
        .init(&store, certificate, &chain, |c| {
            let verified = c.verify_cert()?;
            Ok((verified, c.error(), c.error_depth()))
        })
        .map_err(|e| anyhow!("Failed to run certificate verification: {}", e))?;

    if verified {
        Ok(Verification::Valid)
    } else {
        Ok(Verification::Invalid {
            reason: error.error_string().to_string(),
            depth,
        })
    }
}

/// Byte-for-byte comparison of two names' DER encodings.
pub fn names_equal(a: &X509NameRef, b: &X509NameRef) -> Result<bool> {
    Ok(a.to_der()? == b.to_der()?)
}

/// True when `child` names `issuer` as its issuer and carries a valid
/// signature from `issuer_key`.
pub fn is_issued_by<T: HasPublic>(
    child: &X509Ref,
    issuer: &X509Ref,
    issuer_key: &PKeyRef<T>,
) -> Result<bool> {
    if !names_equal(child.issuer_name(), issuer.subject_name())? {
        return Ok(false);
    }
    if issuer.issued(child) != X509VerifyResult::OK {
        return Ok(false);
    }
    Ok(child.verify(issuer_key)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_intermediate_ca::{IntermediateCA, RsaIntermediateCABuilder};
    use crate::generate_root_ca::RsaRootCABuilder;
    use crate::generate_server_cert::RsaServerCertBuilder;
    use crate::subject::Subject;
    use openssl::pkey::{PKey, Private};

    fn hierarchy(org: &str) -> (PKey<Private>, X509, IntermediateCA) {
        let subject = Subject {
            country: "US".to_string(),
            organization: org.to_string(),
            common_name: format!("{} Root", org),
            ..Subject::default()
        };
        let (root_key, root_cert) = RsaRootCABuilder::new()
            .subject(subject.clone())
            .key_bits(2048)
            .build()
            .unwrap();
        let intermediate = RsaIntermediateCABuilder::new(&root_key, &root_cert)
            .subject(subject.with_common_name(&format!("{} Intermediate", org)))
            .key_bits(2048)
            .build()
            .unwrap();
        (root_key, root_cert, intermediate)
    }

    #[test]
    fn test_issued_leaf_verifies_against_bundle() {
        let (_, root_cert, intermediate) = hierarchy("ACME");
        let server = RsaServerCertBuilder::new(&intermediate.private_key, &intermediate.certificate)
            .fqdn("api.acme.test".to_string())
            .key_bits(2048)
            .build()
            .unwrap();

        let bundle = vec![root_cert, intermediate.certificate.clone()];
        let result = verify_against_bundle(&server.certificate, &bundle).unwrap();
        assert_eq!(result, Verification::Valid);
    }

    #[test]
    fn test_foreign_leaf_fails_verification() {
        let (_, root_cert, intermediate) = hierarchy("ACME");
        let (_, _, other_intermediate) = hierarchy("Globex");
        let foreign = RsaServerCertBuilder::new(
            &other_intermediate.private_key,
            &other_intermediate.certificate,
        )
        .fqdn("api.globex.test".to_string())
        .key_bits(2048)
        .build()
        .unwrap();

        let bundle = vec![root_cert, intermediate.certificate];
        match verify_against_bundle(&foreign.certificate, &bundle).unwrap() {
            Verification::Invalid { reason, depth } => {
                assert!(!reason.is_empty());
                assert_eq!(depth, 0);
            }
            Verification::Valid => panic!("foreign leaf verified"),
        }
    }

    #[test]
    fn test_is_issued_by() {
        let (root_key, root_cert, intermediate) = hierarchy("ACME");
        assert!(is_issued_by(&intermediate.certificate, &root_cert, &root_key).unwrap());
        assert!(is_issued_by(&root_cert, &root_cert, &root_key).unwrap());
        assert!(!is_issued_by(&root_cert, &intermediate.certificate, &intermediate.private_key)
            .unwrap());
    }
}
