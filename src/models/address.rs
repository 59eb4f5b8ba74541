use serde::{Deserialize, Serialize};

/// Cities the storefront delivers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum City {
    Accra,
    Tema,
}

impl City {
    /// Case-insensitive parse; anything outside the serviceable set is None.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ACCRA" => Some(City::Accra),
            "TEMA" => Some(City::Tema),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            City::Accra => "ACCRA",
            City::Tema => "TEMA",
        }
    }
}

/// A saved delivery address, as returned by the address service.
///
/// The checkout flow never mutates these; creation and editing belong to the
/// address book. `city` stays a raw string here because the service owns the
/// format; it is parsed into [`City`] at the point of use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: String,
    pub full_name: String,
    pub street_address: String,
    pub area: String,
    #[serde(default)]
    pub landmark: Option<String>,
    pub city: String,
    pub region: String,
    pub contact_phone: String,
    #[serde(default)]
    pub digital_address: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// New-address form fields entered during checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDraft {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub street_address: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub landmark: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub digital_address: Option<String>,
}

/// Which address is authoritative for the current checkout attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AddressMode {
    /// A saved address selected by id (None until the buyer picks one,
    /// unless the auto-default policy already did).
    #[serde(rename_all = "camelCase")]
    Existing { address_id: Option<String> },
    /// A new address being entered in the checkout form.
    New { draft: AddressDraft },
}

/// The resolved, validated address an order will ship to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolvedAddress {
    Existing(Address),
    New(AddressDraft),
}

impl ResolvedAddress {
    /// Buyer city, parsed; None when the underlying value is unserviceable.
    pub fn city(&self) -> Option<City> {
        match self {
            ResolvedAddress::Existing(addr) => City::parse(&addr.city),
            ResolvedAddress::New(draft) => City::parse(&draft.city),
        }
    }

}
