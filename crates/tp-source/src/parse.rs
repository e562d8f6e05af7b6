//! Lazy record extraction from cleaned source responses.
//!
//! The reader walks the document event by event. Only the subtree of the
//! record currently being read is materialized, so a large day book is
//! never held as a whole tree.

use std::collections::VecDeque;
use std::io::Cursor;

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tp_core::{EntityType, Record, Value};

use crate::error::SourceError;
use crate::request::Layout;
use crate::scalar;
use crate::tags::{ATTRIBUTE_FALLBACKS, ENTRY_LISTS, column_name};

/// Element subtree of one record.
#[derive(Debug, Default)]
struct Node {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Owned form of the reader events the parser reacts to.
enum XmlEvent {
    Open(Node),
    Empty(Node),
    Close,
    Text(String),
    Eof,
    Skip,
}

/// Iterator of records decoded from one response body.
///
/// Yields `Err` at most once, then stops.
pub struct TallyRecords {
    reader: Reader<Cursor<Vec<u8>>>,
    buf: Vec<u8>,
    entity: EntityType,
    layout: Layout,
    company: Option<String>,
    /// Ancestor tags of the cursor while outside a record.
    path: Vec<String>,
    /// Open elements of the record being read.
    building: Vec<Node>,
    pending: VecDeque<Record>,
    status_failed: bool,
    emitted: usize,
    done: bool,
}

impl TallyRecords {
    /// Parse `body` as records of `entity`, stamping `company` on every record
    /// of a company-scoped type.
    #[must_use]
    pub fn new(body: String, entity: EntityType, company: Option<String>) -> Self {
        let mut reader = Reader::from_reader(Cursor::new(body.into_bytes()));
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            entity,
            layout: Layout::for_entity(entity),
            company: company.filter(|_| entity.is_company_scoped()),
            path: Vec::new(),
            building: Vec::new(),
            pending: VecDeque::new(),
            status_failed: false,
            emitted: 0,
            done: false,
        }
    }

    fn next_event(&mut self) -> Result<XmlEvent, SourceError> {
        self.buf.clear();
        let event = match self.reader.read_event_into(&mut self.buf)? {
            Event::Start(start) => XmlEvent::Open(open_node(&start)?),
            Event::Empty(start) => XmlEvent::Empty(open_node(&start)?),
            Event::End(_) => XmlEvent::Close,
            Event::Text(text) => XmlEvent::Text(text.unescape()?.into_owned()),
            Event::CData(data) => {
                XmlEvent::Text(String::from_utf8_lossy(&data.into_inner()).into_owned())
            }
            Event::Eof => XmlEvent::Eof,
            _ => XmlEvent::Skip,
        };
        Ok(event)
    }

    fn starts_record(&self, tag: &str) -> bool {
        match self.layout {
            Layout::Collection { .. } => self.path.last().is_some_and(|p| p == "COLLECTION"),
            Layout::DayBook => tag == "VOUCHER",
        }
    }

    /// Advance the reader until at least one record is pending or the
    /// document ends.
    fn fill(&mut self) -> Result<(), SourceError> {
        while self.pending.is_empty() {
            match self.next_event()? {
                XmlEvent::Open(node) => {
                    if !self.building.is_empty() || self.starts_record(&node.tag) {
                        self.building.push(node);
                    } else {
                        self.path.push(node.tag);
                    }
                }
                XmlEvent::Empty(node) => {
                    if let Some(parent) = self.building.last_mut() {
                        parent.children.push(node);
                    } else if self.starts_record(&node.tag) {
                        self.finish_record(&node);
                    }
                }
                XmlEvent::Close => {
                    if let Some(node) = self.building.pop() {
                        match self.building.last_mut() {
                            Some(parent) => parent.children.push(node),
                            None => self.finish_record(&node),
                        }
                    } else {
                        self.path.pop();
                    }
                }
                XmlEvent::Text(text) => {
                    if let Some(node) = self.building.last_mut() {
                        node.text.push_str(&text);
                    } else {
                        self.outside_text(&text)?;
                    }
                }
                XmlEvent::Eof => {
                    if self.status_failed && self.emitted == 0 {
                        return Err(SourceError::Rejected(
                            "source reported a failed request status".into(),
                        ));
                    }
                    self.done = true;
                    return Ok(());
                }
                XmlEvent::Skip => {}
            }
        }
        Ok(())
    }

    /// Text outside any record: only error reporting elements matter.
    fn outside_text(&mut self, text: &str) -> Result<(), SourceError> {
        match self.path.last().map(String::as_str) {
            Some("LINEERROR") => Err(SourceError::Rejected(text.trim().to_string())),
            Some("STATUS") if text.trim() == "0" => {
                self.status_failed = true;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn finish_record(&mut self, node: &Node) {
        let company = self.company.as_deref();
        let records = match self.entity {
            EntityType::Voucher => vec![voucher_record(node, company)],
            EntityType::VoucherEntry => entry_records(node, company),
            master => vec![master_record(node, master, company)],
        };
        self.pending.extend(records);
    }
}

impl Iterator for TallyRecords {
    type Item = Result<Record, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending.is_empty() && !self.done {
            if let Err(err) = self.fill() {
                self.done = true;
                self.pending.clear();
                return Some(Err(err));
            }
        }
        let record = self.pending.pop_front()?;
        self.emitted += 1;
        Some(Ok(record))
    }
}

fn open_node(start: &BytesStart<'_>) -> Result<Node, SourceError> {
    let tag = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| SourceError::Malformed(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(Node {
        tag,
        attrs,
        ..Node::default()
    })
}

// ---------------------------------------------------------------------------
// Node -> Record
// ---------------------------------------------------------------------------

/// Column/value pairs of an element's children, grouped by column in order
/// of first appearance. Repeated columns become a structured array.
fn fields_of(node: &Node, entity: EntityType, skip: &[&str]) -> Vec<(String, Value)> {
    let mut grouped: IndexMap<String, Vec<&Node>> = IndexMap::new();
    for child in node.children.iter().filter(|c| !skip.contains(&c.tag.as_str())) {
        grouped
            .entry(column_name(entity, &child.tag))
            .or_default()
            .push(child);
    }

    let mut fields: Vec<(String, Value)> = grouped
        .into_iter()
        .map(|(column, nodes)| {
            let value = match nodes.as_slice() {
                [single] => node_value(single, entity),
                many => Value::Structured(serde_json::Value::Array(
                    many.iter().map(|n| node_json(n, entity)).collect(),
                )),
            };
            (column, value)
        })
        .collect();

    for (attr, column) in ATTRIBUTE_FALLBACKS {
        let present = fields.iter().any(|(c, v)| c == column && !v.is_blank());
        if present {
            continue;
        }
        if let Some(raw) = node.attr(attr) {
            let value = Value::Text(raw.trim().to_string());
            match fields.iter_mut().find(|(c, _)| c == column) {
                Some(slot) => slot.1 = value,
                None => fields.push(((*column).to_string(), value)),
            }
        }
    }
    fields
}

fn node_value(node: &Node, entity: EntityType) -> Value {
    if node.is_leaf() {
        scalar::infer_field(&node.tag, &node.text)
    } else {
        Value::Structured(node_json(node, entity))
    }
}

fn node_json(node: &Node, entity: EntityType) -> serde_json::Value {
    if node.is_leaf() {
        let text = node.text.trim();
        return if text.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::Value::String(text.to_string())
        };
    }
    let mut map = serde_json::Map::new();
    for child in &node.children {
        let key = column_name(entity, &child.tag);
        let value = node_json(child, entity);
        match map.get_mut(&key) {
            Some(serde_json::Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = serde_json::Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key, value);
            }
        }
    }
    serde_json::Value::Object(map)
}

/// Start a record with the company stamp first, so it leads the column order.
fn stamped(company: Option<&str>) -> Record {
    let mut record = Record::new();
    if let Some(company) = company {
        record.insert("company", company);
    }
    record
}

fn master_record(node: &Node, entity: EntityType, company: Option<&str>) -> Record {
    let mut record = stamped(company);
    for (column, value) in fields_of(node, entity, &[]) {
        if column == "company" && company.is_some() {
            continue;
        }
        record.insert(column, value);
    }
    record
}

fn voucher_record(node: &Node, company: Option<&str>) -> Record {
    let mut record = stamped(company);
    for (column, value) in fields_of(node, EntityType::Voucher, ENTRY_LISTS) {
        if column == "company" && company.is_some() {
            continue;
        }
        record.insert(column, value);
    }
    record
}

/// Columns copied from the voucher onto each of its entries.
const VOUCHER_CONTEXT: [&str; 3] = ["voucher_number", "voucher_date", "voucher_type"];

fn entry_records(node: &Node, company: Option<&str>) -> Vec<Record> {
    let voucher = voucher_record(node, company);
    let entries = node
        .children
        .iter()
        .filter(|c| ENTRY_LISTS.contains(&c.tag.as_str()) && !c.is_leaf());

    let mut records = Vec::new();
    for (index, entry) in entries.enumerate() {
        let mut record = stamped(company);
        for column in VOUCHER_CONTEXT {
            record.insert(column, voucher.get(column).cloned().unwrap_or(Value::Null));
        }
        let line = i64::try_from(index + 1).unwrap_or(i64::MAX);
        record.insert("line_number", line);

        for (column, value) in fields_of(entry, EntityType::VoucherEntry, &[]) {
            if record.get(&column).is_some() {
                continue;
            }
            record.insert(column, value);
        }
        records.push(record);
    }
    records
}
