//! PKCS#15 object and directory types
//!
//! Only the parts provisioning needs: object classes to pick a target
//! directory, and the well-known object directories with the fixed file
//! identifiers this card uses for them.

/// Broad class of a PKCS#15 object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    PrivateKey,
    PublicKey,
    SecretKey,
    Certificate,
    DataObject,
    Authentication,
}

/// Concrete PKCS#15 object type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    PrivateKeyRsa,
    PrivateKeyEc,
    PublicKeyRsa,
    PublicKeyEc,
    SecretKey,
    CertX509,
    DataObject,
    AuthPin,
}

impl ObjectType {
    pub fn class(self) -> ObjectClass {
        match self {
            Self::PrivateKeyRsa | Self::PrivateKeyEc => ObjectClass::PrivateKey,
            Self::PublicKeyRsa | Self::PublicKeyEc => ObjectClass::PublicKey,
            Self::SecretKey => ObjectClass::SecretKey,
            Self::CertX509 => ObjectClass::Certificate,
            Self::DataObject => ObjectClass::DataObject,
            Self::AuthPin => ObjectClass::Authentication,
        }
    }
}

/// Object directory types listed in the ODF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DfType {
    PrKdf,
    PuKdf,
    PuKdfTrusted,
    SKdf,
    Cdf,
    CdfTrusted,
    CdfUseful,
    Dodf,
    Aodf,
}

impl DfType {
    pub const ALL: [DfType; 9] = [
        DfType::PrKdf,
        DfType::PuKdf,
        DfType::PuKdfTrusted,
        DfType::SKdf,
        DfType::Cdf,
        DfType::CdfTrusted,
        DfType::CdfUseful,
        DfType::Dodf,
        DfType::Aodf,
    ];

    /// Identifier of the directory holding objects of this type
    ///
    /// Only four directory types have one; the rest cannot be resolved.
    pub fn fixed_id(self) -> Option<u16> {
        match self {
            DfType::PrKdf => Some(0x1001),
            DfType::PuKdf => Some(0x1002),
            DfType::Cdf => Some(0x1003),
            DfType::Dodf => Some(0x1004),
            _ => None,
        }
    }

    /// Profile entry name of the directory file
    pub fn profile_name(self) -> Option<&'static str> {
        DIRECTORY_ROLES
            .iter()
            .find(|role| role.df_type == self)
            .map(|role| role.name)
    }
}

/// A well-known object directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryRole {
    pub name: &'static str,
    /// `None` for the authentication directory, which is never created here
    pub id: Option<u16>,
    pub df_type: DfType,
}

pub const DIRECTORY_ROLES: [DirectoryRole; 5] = [
    DirectoryRole { name: "PKCS15-PrKDF", id: Some(0x1001), df_type: DfType::PrKdf },
    DirectoryRole { name: "PKCS15-PuKDF", id: Some(0x1002), df_type: DfType::PuKdf },
    DirectoryRole { name: "PKCS15-CDF", id: Some(0x1003), df_type: DfType::Cdf },
    DirectoryRole { name: "PKCS15-DODF", id: Some(0x1004), df_type: DfType::Dodf },
    DirectoryRole { name: "PKCS15-AODF", id: None, df_type: DfType::Aodf },
];

/// Look up a role by profile entry name, ignoring ASCII case
pub fn role_for_name(name: &str) -> Option<&'static DirectoryRole> {
    DIRECTORY_ROLES.iter().find(|role| role.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_classes() {
        assert_eq!(ObjectType::PrivateKeyRsa.class(), ObjectClass::PrivateKey);
        assert_eq!(ObjectType::CertX509.class(), ObjectClass::Certificate);
        assert_eq!(ObjectType::PublicKeyEc.class(), ObjectClass::PublicKey);
        assert_eq!(ObjectType::DataObject.class(), ObjectClass::DataObject);
    }

    #[test]
    fn test_fixed_ids_match_roles() {
        for role in DIRECTORY_ROLES.iter() {
            assert_eq!(role.df_type.fixed_id(), role.id, "{}", role.name);
        }
        let resolvable = DfType::ALL.iter().filter(|t| t.fixed_id().is_some()).count();
        assert_eq!(resolvable, 4);
    }

    #[test]
    fn test_role_lookup_ignores_case() {
        assert_eq!(role_for_name("pkcs15-cdf").map(|r| r.id), Some(Some(0x1003)));
        assert_eq!(role_for_name("PKCS15-AODF").map(|r| r.id), Some(None));
        assert!(role_for_name("PKCS15-ODF").is_none());
    }

    #[test]
    fn test_profile_names() {
        assert_eq!(DfType::PrKdf.profile_name(), Some("PKCS15-PrKDF"));
        assert_eq!(DfType::SKdf.profile_name(), None);
    }
}
