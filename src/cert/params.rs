use bon::Builder;
use const_oid::ObjectIdentifier;
use const_oid::db::rfc4519::{
    COMMON_NAME, COUNTRY_NAME, LOCALITY_NAME, ORGANIZATION_NAME, ORGANIZATIONAL_UNIT_NAME,
    ST as STATE_OR_PROVINCE_NAME,
};
use der::asn1::{Any, PrintableStringRef, SetOfVec, Utf8StringRef};
use serde::Deserialize;
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
use crate::error::CertSmithError;

/// Distinguished name parameters, also known as the issuer profile.
///
/// Every field is optional. An absent field is left out of the name entirely; an
/// empty string is a present value and is kept by [`DistinguishedName::encode`].
///
/// # Fields
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
/// * `common_name` - The common name (CN).
#[derive(Clone, Debug, Default, PartialEq, Eq, Builder, Deserialize)]
pub struct DistinguishedName {
    #[serde(rename = "countryName")]
    pub country: Option<String>,
    #[serde(rename = "stateName")]
    pub state: Option<String>,
    #[serde(rename = "locality")]
    pub locality: Option<String>,
    #[serde(rename = "organization")]
    pub organization: Option<String>,
    #[serde(rename = "organizationalUnit")]
    pub organization_unit: Option<String>,
    #[serde(rename = "commonName")]
    pub common_name: Option<String>,
}

impl DistinguishedName {
    /// Present fields as `(short name, OID, value)` in canonical order.
    fn fields(&self) -> impl Iterator<Item = (&'static str, ObjectIdentifier, &str)> {
        [
            ("C", COUNTRY_NAME, &self.country),
            ("ST", STATE_OR_PROVINCE_NAME, &self.state),
            ("L", LOCALITY_NAME, &self.locality),
            ("O", ORGANIZATION_NAME, &self.organization),
            ("OU", ORGANIZATIONAL_UNIT_NAME, &self.organization_unit),
            ("CN", COMMON_NAME, &self.common_name),
        ]
        .into_iter()
        .filter_map(|(short, oid, value)| value.as_deref().map(|v| (short, oid, v)))
    }

    /// Encodes the name as an OpenSSL style subject string, e.g. `/C=CN/CN=quan.dev`.
    ///
    /// Values are not escaped: a `/` or `=` inside a value produces an ambiguous
    /// string, so callers must sanitize beforehand.
    pub fn encode(&self) -> String {
        self.fields()
            .map(|(short, _, value)| format!("/{short}={value}"))
            .collect()
    }

    /// Converts the distinguished name to an X.509-compatible format.
    ///
    /// One RDN per field, same order as [`DistinguishedName::encode`]. Empty values are
    /// dropped here since an empty attribute carries no identity. The country is a
    /// PrintableString, everything else a UTF8String.
    ///
    /// # Returns
    /// An `x509_cert::name::DistinguishedName` object.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::DistinguishedName, CertSmithError> {
        let mut rdns = Vec::new();
        for (short, oid, value) in self.fields().filter(|(_, _, v)| !v.is_empty()) {
            let value = if oid == COUNTRY_NAME {
                PrintableStringRef::new(value).and_then(|s| Any::encode_from(&s))
            } else {
                Utf8StringRef::new(value).and_then(|s| Any::encode_from(&s))
            }
            .map_err(|e| CertSmithError::EncodingError(format!("invalid {short} value: {e}")))?;
            let attr = AttributeTypeAndValue { oid, value };
            rdns.push(RelativeDistinguishedName(SetOfVec::try_from(vec![attr])?));
        }
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509-compatible format.
    ///
    /// Attributes other than the six supported ones are ignored.
    pub fn from_x509_name(
        x509dn: &x509_cert::name::DistinguishedName,
    ) -> Result<Self, CertSmithError> {
        let mut dn = DistinguishedName::default();
        for attr in x509dn.0.iter().flat_map(|rdn| rdn.0.iter()) {
            let slot = match attr.oid {
                COUNTRY_NAME => &mut dn.country,
                STATE_OR_PROVINCE_NAME => &mut dn.state,
                LOCALITY_NAME => &mut dn.locality,
                ORGANIZATION_NAME => &mut dn.organization,
                ORGANIZATIONAL_UNIT_NAME => &mut dn.organization_unit,
                COMMON_NAME => &mut dn.common_name,
                _ => continue,
            };
            let value = attr
                .value
                .decode_as::<PrintableStringRef<'_>>()
                .map(|s| s.to_string())
                .or_else(|_| attr.value.decode_as::<Utf8StringRef<'_>>().map(|s| s.to_string()))?;
            *slot = Some(value);
        }
        Ok(dn)
    }
}

const SECONDS_PER_DAY: i64 = 86_400;

/// Last year GeneralizedTime can express.
const MAX_YEAR: i32 = 9999;

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    ///
    /// The start is truncated to whole seconds, the precision certificates store, so
    /// `not_after - not_before` is exactly `days` days once encoded. A non-positive
    /// count, or one that pushes `not_after` past 9999-12-31, is
    /// [`CertSmithError::InvalidDuration`].
    pub fn for_days(days: i64) -> Result<Self, CertSmithError> {
        let now = OffsetDateTime::now_utc();
        let not_before = now.replace_nanosecond(0).unwrap_or(now);
        Self::starting_at(not_before, days)
    }

    /// Validity of `days` days starting at `not_before`.
    pub fn starting_at(not_before: OffsetDateTime, days: i64) -> Result<Self, CertSmithError> {
        if days <= 0 {
            return Err(CertSmithError::InvalidDuration(days));
        }
        let not_after = days
            .checked_mul(SECONDS_PER_DAY)
            .map(Duration::seconds)
            .and_then(|length| not_before.checked_add(length))
            .filter(|not_after| not_after.year() <= MAX_YEAR)
            .ok_or(CertSmithError::InvalidDuration(days))?;
        Ok(Self {
            not_before,
            not_after,
        })
    }

    /// Whether `instant` falls in `[not_before, not_after)`.
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.not_before <= instant && instant < self.not_after
    }

    /// Length of the period.
    pub fn duration(&self) -> Duration {
        self.not_after - self.not_before
    }
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    ///
    /// # Arguments
    /// * `extension` - The extension to encode.
    /// * `critical` - Indicates if the extension is critical.
    pub fn from_extension<E: ToAndFromX509Extension>(
        extension: &E,
        critical: bool,
    ) -> Result<Self, CertSmithError> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    ///
    /// # Returns
    /// A decoded extension object.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E, CertSmithError> {
        E::from_x509_extension_value(&self.value)
    }
}
