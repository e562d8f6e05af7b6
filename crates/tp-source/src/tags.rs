//! Source tag to column name mapping.

use tp_core::EntityType;

/// Tags the source emits as single run-together words.
const KNOWN_TAGS: &[(&str, &str)] = &[
    ("ALTERID", "alter_id"),
    ("AMOUNT", "amount"),
    ("BASICBASEPARTYNAME", "basic_base_party_name"),
    ("CATEGORY", "category"),
    ("CLOSINGBALANCE", "closing_balance"),
    ("COMPANYNUMBER", "company_number"),
    ("EFFECTIVEDATE", "effective_date"),
    ("EMAIL", "email"),
    ("GUID", "guid"),
    ("ISDEEMEDPOSITIVE", "is_deemed_positive"),
    ("ISPARTYLEDGER", "is_party_ledger"),
    ("LEDGERNAME", "ledger_name"),
    ("MASTERID", "master_id"),
    ("NAME", "name"),
    ("NARRATION", "narration"),
    ("OPENINGBALANCE", "opening_balance"),
    ("PARENT", "parent"),
    ("PARTYLEDGERNAME", "party_ledger_name"),
    ("PERSISTEDVIEW", "persisted_view"),
    ("PHONE", "phone"),
    ("PINCODE", "pincode"),
    ("REFERENCE", "reference"),
    ("REFERENCEDATE", "reference_date"),
    ("STATE", "state"),
    ("VOUCHERKEY", "voucher_key"),
    ("VOUCHERNUMBER", "voucher_number"),
    ("VOUCHERTYPENAME", "voucher_type"),
];

/// Attributes read when the element carries no child of the same column.
pub const ATTRIBUTE_FALLBACKS: &[(&str, &str)] = &[("NAME", "name"), ("VCHTYPE", "voucher_type")];

/// Child lists of a voucher that hold its ledger entries.
pub const ENTRY_LISTS: &[&str] = &["ALLLEDGERENTRIES.LIST", "LEDGERENTRIES.LIST"];

/// Column name for a source tag.
///
/// `DATE` on vouchers becomes `voucher_date` so entries and vouchers share
/// key columns. Unknown tags are lower-cased with punctuation folded to `_`.
#[must_use]
pub fn column_name(entity: EntityType, tag: &str) -> String {
    if tag == "DATE" && matches!(entity, EntityType::Voucher | EntityType::VoucherEntry) {
        return "voucher_date".to_string();
    }
    if let Some((_, column)) = KNOWN_TAGS.iter().find(|(known, _)| *known == tag) {
        return (*column).to_string();
    }
    let mut column: String = tag
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    while column.contains("__") {
        column = column.replace("__", "_");
    }
    column.trim_matches('_').to_string()
}
