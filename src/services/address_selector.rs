//! Resolves which shipping address is authoritative for a checkout attempt.
//!
//! Pure validation and selection policy; persistence belongs to the address
//! book. Validation failures come back as a field→kind map so the form can
//! highlight each offending field.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{CheckoutError, FieldErrorKind, FieldErrors};
use crate::models::{Address, AddressDraft, AddressMode, City, ResolvedAddress};

/// Ghanaian mobile prefixes accepted for the contact phone.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(020|023|024|025|026|027|028|029|050|054|055|056|057|059)\d{7}$")
        .expect("phone pattern")
});

/// GhanaPostGPS digital address, post-normalization.
static DIGITAL_ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}-\d{3}-\d{4}$").expect("digital address pattern"));

/// Strips everything but digits.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validates a contact phone, returning the normalized digit string.
pub fn validate_phone(raw: &str) -> Result<String, FieldErrorKind> {
    let digits = normalize_phone(raw);
    if PHONE_RE.is_match(&digits) {
        Ok(digits)
    } else {
        Err(FieldErrorKind::InvalidPhone)
    }
}

/// Normalizes a digital address to `AA-123-4567`: strip non-alphanumerics,
/// uppercase, re-insert dashes. Returns the canonical form, or the error
/// kind when the remaining characters cannot form a valid code.
pub fn normalize_digital_address(raw: &str) -> Result<String, FieldErrorKind> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.len() != 9 {
        return Err(FieldErrorKind::InvalidDigitalAddress);
    }
    let candidate = format!("{}-{}-{}", &cleaned[..2], &cleaned[2..5], &cleaned[5..]);
    if DIGITAL_ADDRESS_RE.is_match(&candidate) {
        Ok(candidate)
    } else {
        Err(FieldErrorKind::InvalidDigitalAddress)
    }
}

/// Validates new-address form fields, returning a normalized draft.
///
/// Collects every failing field instead of stopping at the first one.
pub fn validate_draft(draft: &AddressDraft) -> Result<AddressDraft, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut normalized = draft.clone();

    let required = [
        ("fullName", draft.full_name.trim()),
        ("streetAddress", draft.street_address.trim()),
        ("area", draft.area.trim()),
        ("city", draft.city.trim()),
        ("region", draft.region.trim()),
        ("contactPhone", draft.contact_phone.trim()),
    ];
    for (field, value) in required {
        if value.is_empty() {
            errors.insert(field.to_string(), FieldErrorKind::Required);
        }
    }

    if !draft.city.trim().is_empty() && City::parse(&draft.city).is_none() {
        errors.insert("city".to_string(), FieldErrorKind::UnsupportedCity);
    }

    if !draft.contact_phone.trim().is_empty() {
        match validate_phone(&draft.contact_phone) {
            Ok(digits) => normalized.contact_phone = digits,
            Err(kind) => {
                errors.insert("contactPhone".to_string(), kind);
            }
        }
    }

    if let Some(digital) = draft
        .digital_address
        .as_deref()
        .filter(|v| !v.trim().is_empty())
    {
        match normalize_digital_address(digital) {
            Ok(canonical) => normalized.digital_address = Some(canonical),
            Err(kind) => {
                errors.insert("digitalAddress".to_string(), kind);
            }
        }
    } else {
        normalized.digital_address = None;
    }

    if errors.is_empty() {
        Ok(normalized)
    } else {
        Err(errors)
    }
}

/// Selection policy applied when the address list loads: the default
/// address if exactly one is marked default, else the first in list order,
/// else new-address mode for an empty book.
pub fn auto_select(addresses: &[Address]) -> AddressMode {
    if addresses.is_empty() {
        return AddressMode::New {
            draft: AddressDraft::default(),
        };
    }
    let defaults: Vec<&Address> = addresses.iter().filter(|a| a.is_default).collect();
    let chosen = match defaults.as_slice() {
        [only] => only.id.clone(),
        // No conflict-resolution rule exists for multiple defaults;
        // first wins, same as an empty default set.
        _ => defaults
            .first()
            .map(|a| a.id.clone())
            .unwrap_or_else(|| addresses[0].id.clone()),
    };
    AddressMode::Existing {
        address_id: Some(chosen),
    }
}

/// Resolves the authoritative address for this checkout attempt.
pub fn resolve(mode: &AddressMode, addresses: &[Address]) -> Result<ResolvedAddress, CheckoutError> {
    match mode {
        AddressMode::Existing { address_id } => {
            let id = address_id.as_deref().ok_or(CheckoutError::NoAddressSelected)?;
            let address = addresses
                .iter()
                .find(|a| a.id == id)
                .ok_or(CheckoutError::NoAddressSelected)?;
            Ok(ResolvedAddress::Existing(address.clone()))
        }
        AddressMode::New { draft } => {
            let normalized = validate_draft(draft).map_err(CheckoutError::Validation)?;
            Ok(ResolvedAddress::New(normalized))
        }
    }
}
