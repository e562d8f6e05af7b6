//! XML request envelopes.
//!
//! Masters are fetched with an inline collection definition listing the
//! fields to return. Vouchers (and the entries nested in them) come from the
//! day book report over a date window.

use chrono::NaiveDate;
use quick_xml::escape::escape;
use tp_core::EntityType;

/// How an entity type's records are requested and where they sit in the
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Records are the children of `<COLLECTION>`.
    Collection {
        id: &'static str,
        object_type: &'static str,
        fetch: &'static str,
    },
    /// Records are `<VOUCHER>` elements of the day book.
    DayBook,
}

impl Layout {
    #[must_use]
    pub const fn for_entity(entity: EntityType) -> Self {
        match entity {
            EntityType::Company => Self::Collection {
                id: "List of Companies",
                object_type: "Company",
                fetch: "NAME,GUID,EMAIL,STATE,PINCODE,PHONE,COMPANYNUMBER",
            },
            EntityType::Division => Self::Collection {
                id: "List of Cost Centres",
                object_type: "CostCentre",
                fetch: "NAME,GUID,PARENT,CATEGORY",
            },
            EntityType::Group => Self::Collection {
                id: "List of Groups",
                object_type: "Group",
                fetch: "NAME,GUID,PARENT",
            },
            EntityType::Ledger => Self::Collection {
                id: "List of Ledgers",
                object_type: "Ledger",
                fetch: "NAME,GUID,PARENT,OPENINGBALANCE,CLOSINGBALANCE",
            },
            EntityType::Voucher | EntityType::VoucherEntry => Self::DayBook,
        }
    }
}

/// Date window of a day book export. `from` unset leaves the source's
/// current period start in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: NaiveDate,
}

/// Build the request body for an entity type.
#[must_use]
pub fn build_request(entity: EntityType, company: Option<&str>, window: DateWindow) -> String {
    match Layout::for_entity(entity) {
        Layout::Collection {
            id,
            object_type,
            fetch,
        } => collection_request(id, object_type, fetch, company),
        Layout::DayBook => day_book_request(company, window),
    }
}

fn collection_request(id: &str, object_type: &str, fetch: &str, company: Option<&str>) -> String {
    let statics = company.map_or_else(
        || "<STATICVARIABLES />".to_string(),
        |name| {
            format!(
                "<STATICVARIABLES><SVCURRENTCOMPANY>{}</SVCURRENTCOMPANY></STATICVARIABLES>",
                escape(name)
            )
        },
    );
    format!(
        "<ENVELOPE>\
<HEADER><VERSION>1</VERSION><TALLYREQUEST>Export</TALLYREQUEST><TYPE>Collection</TYPE><ID>{id}</ID></HEADER>\
<BODY><DESC>{statics}\
<TDL><TDLMESSAGE><COLLECTION NAME=\"{id}\"><TYPE>{object_type}</TYPE><FETCH>{fetch}</FETCH></COLLECTION></TDLMESSAGE></TDL>\
</DESC></BODY></ENVELOPE>"
    )
}

fn day_book_request(company: Option<&str>, window: DateWindow) -> String {
    let mut statics = String::from("<SVEXPORTFORMAT>$$SysName:XML</SVEXPORTFORMAT>");
    if let Some(name) = company {
        statics.push_str(&format!("<SVCURRENTCOMPANY>{}</SVCURRENTCOMPANY>", escape(name)));
    }
    if let Some(from) = window.from {
        statics.push_str(&format!("<SVFROMDATE TYPE=\"Date\">{}</SVFROMDATE>", source_date(from)));
    }
    statics.push_str(&format!("<SVTODATE TYPE=\"Date\">{}</SVTODATE>", source_date(window.to)));
    format!(
        "<ENVELOPE>\
<HEADER><TALLYREQUEST>Export Data</TALLYREQUEST></HEADER>\
<BODY><EXPORTDATA><REQUESTDESC><REPORTNAME>DayBook</REPORTNAME>\
<STATICVARIABLES>{statics}</STATICVARIABLES>\
</REQUESTDESC></EXPORTDATA></BODY></ENVELOPE>"
    )
}

/// `1-Apr-2024`, the date form the source accepts in static variables.
fn source_date(date: NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> DateWindow {
        DateWindow {
            from: NaiveDate::from_ymd_opt(2023, 4, 1),
            to: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        }
    }

    #[test]
    fn company_request_is_unscoped() {
        let xml = build_request(EntityType::Company, None, window());
        assert!(xml.contains("<STATICVARIABLES />"));
        assert!(xml.contains("<TYPE>Company</TYPE>"));
        assert!(xml.contains("<FETCH>NAME,GUID,EMAIL,STATE,PINCODE,PHONE,COMPANYNUMBER</FETCH>"));
    }

    #[test]
    fn ledger_request_is_scoped_and_escaped() {
        let xml = build_request(EntityType::Ledger, Some("R&D <India>"), window());
        assert!(xml.contains("<SVCURRENTCOMPANY>R&amp;D &lt;India&gt;</SVCURRENTCOMPANY>"));
        assert!(xml.contains("OPENINGBALANCE,CLOSINGBALANCE"));
    }

    #[test]
    fn division_maps_to_cost_centres() {
        let xml = build_request(EntityType::Division, Some("Acme"), window());
        assert!(xml.contains("<TYPE>CostCentre</TYPE>"));
    }

    #[test]
    fn day_book_carries_window() {
        let xml = build_request(EntityType::VoucherEntry, Some("Acme"), window());
        assert!(xml.contains("<REPORTNAME>DayBook</REPORTNAME>"));
        assert!(xml.contains("<SVFROMDATE TYPE=\"Date\">1-Apr-2023</SVFROMDATE>"));
        assert!(xml.contains("<SVTODATE TYPE=\"Date\">31-Mar-2025</SVTODATE>"));
    }

    #[test]
    fn open_window_omits_from_date() {
        let open = DateWindow {
            from: None,
            ..window()
        };
        let xml = build_request(EntityType::Voucher, Some("Acme"), open);
        assert!(!xml.contains("SVFROMDATE"));
    }
}
