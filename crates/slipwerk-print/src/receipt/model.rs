// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Receipt model and section extractors.
//
// A receipt template is recognised by a fixed set of class markers:
//
//   .title                      receipt heading
//   .order-info                 <strong>Label</strong> value pairs, .info-line rows
//   .item-row (repeated)        three spans; the first row is the column header
//   .totals > *total*           two spans: label, amount
//   .payments                   .payment-row (two spans), optional .change-line
//   .order-notes-section        optional .section-title and .order-notes
//   .footer                     .footer-message, .footer-website
//
// Every extractor is independent and returns `None`/empty when its section is
// absent, so a partial template still yields a partial receipt.

use super::html::{self, Element, Node};

/// One line of the order-info block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoLine {
    /// `Label: value`; the label always ends with `:`.
    Pair { label: String, value: String },
    Text(String),
}

impl InfoLine {
    pub fn render(&self) -> String {
        match self {
            Self::Pair { label, value } => format!("{label} {value}"),
            Self::Text(text) => text.clone(),
        }
    }
}

/// A three-column item row (name, quantity, amount).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub name: String,
    pub quantity: String,
    pub amount: String,
}

/// A label/amount row used by totals and payments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledAmount {
    pub label: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaymentsBlock {
    pub title: Option<String>,
    pub rows: Vec<LabeledAmount>,
    pub change: Option<LabeledAmount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotesBlock {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// Structured receipt extracted from job HTML. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceiptModel {
    pub title: Option<String>,
    pub info: Vec<InfoLine>,
    pub header: Option<ItemRow>,
    pub items: Vec<ItemRow>,
    pub totals: Vec<LabeledAmount>,
    pub payments: Option<PaymentsBlock>,
    pub notes: Option<NotesBlock>,
    pub footer: Vec<String>,
}

impl ReceiptModel {
    /// Build the model from raw job HTML.
    pub fn from_html(content: &str) -> Self {
        let root = html::parse(content);
        let (header, items) = extract_items(&root);
        Self {
            title: extract_title(&root),
            info: extract_order_info(&root),
            header,
            items,
            totals: extract_totals(&root),
            payments: extract_payments(&root),
            notes: extract_notes(&root),
            footer: extract_footer(&root),
        }
    }

    /// True when no section produced any content.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.info.is_empty()
            && self.header.is_none()
            && self.items.is_empty()
            && self.totals.is_empty()
            && self.payments.is_none()
            && self.notes.is_none()
            && self.footer.is_empty()
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

/// Text of an element's first two (label, amount) spans, label required.
fn labeled_amount(row: &Element) -> Option<LabeledAmount> {
    let spans = row.span_texts();
    match spans.as_slice() {
        [label, amount, ..] if !label.is_empty() => Some(LabeledAmount {
            label: label.clone(),
            amount: amount.clone(),
        }),
        _ => None,
    }
}

fn three_columns(row: &Element) -> Option<ItemRow> {
    let spans = row.span_texts();
    match spans.as_slice() {
        [name, quantity, amount, ..] if !name.is_empty() => Some(ItemRow {
            name: name.clone(),
            quantity: quantity.clone(),
            amount: amount.clone(),
        }),
        _ => None,
    }
}

pub fn extract_title(root: &Element) -> Option<String> {
    root.find_class("title").and_then(|e| non_empty(e.text()))
}

/// `<strong>Label</strong> value` pairs anywhere inside `.order-info`, then
/// `.info-line` rows whose text is not already covered by an earlier line.
pub fn extract_order_info(root: &Element) -> Vec<InfoLine> {
    let Some(block) = root.find_class("order-info") else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    collect_strong_pairs(block, &mut lines);

    for row in block.find_all(|e| e.has_class("info-line")) {
        // Rows holding a <strong> label were already taken as pairs.
        if row.find(|e| e.tag == "strong").is_some() {
            continue;
        }
        let text = row.text();
        if text.is_empty() {
            continue;
        }
        let covered = lines.iter().any(|l: &InfoLine| l.render().contains(&text));
        if !covered {
            lines.push(InfoLine::Text(text));
        }
    }
    lines
}

fn collect_strong_pairs(el: &Element, out: &mut Vec<InfoLine>) {
    for (i, child) in el.children.iter().enumerate() {
        let Node::Element(child_el) = child else {
            continue;
        };
        if child_el.tag != "strong" {
            collect_strong_pairs(child_el, out);
            continue;
        }

        let mut label = child_el.text();
        let value = match el.children.get(i + 1) {
            Some(Node::Text(t)) => html::collapse_whitespace(t),
            _ => String::new(),
        };
        if label.is_empty() || value.is_empty() {
            continue;
        }
        if !label.ends_with(':') {
            label.push(':');
        }
        out.push(InfoLine::Pair { label, value });
    }
}

/// All `.item-row` elements; the first is the column header.
///
/// The header is kept only when it has three spans and a non-empty first
/// column. Item rows need three spans and a non-empty name.
pub fn extract_items(root: &Element) -> (Option<ItemRow>, Vec<ItemRow>) {
    let rows = root.find_all(|e| e.has_class("item-row"));
    let Some((first, rest)) = rows.split_first() else {
        return (None, Vec::new());
    };
    let header = three_columns(first);
    let items = rest.iter().filter_map(|row| three_columns(row)).collect();
    (header, items)
}

/// Rows inside `.totals` whose class mentions `total` (`total-row`,
/// `grand-total-row`, ...).
pub fn extract_totals(root: &Element) -> Vec<LabeledAmount> {
    let Some(block) = root.find_class("totals") else {
        return Vec::new();
    };
    block
        .find_all(|e| e.has_class_containing("total"))
        .into_iter()
        .filter_map(labeled_amount)
        .collect()
}

/// The payments block, present only when it holds payment rows.
pub fn extract_payments(root: &Element) -> Option<PaymentsBlock> {
    let block = root.find_class("payments")?;
    let has_rows = block
        .find(|e| e.has_class("payment-row") || e.has_class("payment-info"))
        .is_some();
    if !has_rows {
        return None;
    }

    let title = block
        .find_class("section-title")
        .or_else(|| root.find(|e| e.has_class("section-title") && mentions_payment(&e.text())))
        .and_then(|e| non_empty(e.text()));

    let rows = block
        .find_all(|e| e.has_class("payment-row"))
        .into_iter()
        .filter_map(labeled_amount)
        .collect();

    let change = block.find_class("change-line").and_then(|line| {
        let spans = line.span_texts();
        match spans.as_slice() {
            [label, amount, ..] => Some(LabeledAmount {
                label: label.clone(),
                amount: amount.clone(),
            }),
            _ => None,
        }
    });

    Some(PaymentsBlock {
        title,
        rows,
        change,
    })
}

fn mentions_payment(text: &str) -> bool {
    let upper = text.to_uppercase();
    upper.contains("ÖDEME") || upper.contains("PAY")
}

pub fn extract_notes(root: &Element) -> Option<NotesBlock> {
    let section = root.find_class("order-notes-section")?;
    let title = section
        .find_class("section-title")
        .and_then(|e| non_empty(e.text()));
    let body = section
        .find_class("order-notes")
        .and_then(|e| non_empty(e.text()));
    if title.is_none() && body.is_none() {
        return None;
    }
    Some(NotesBlock { title, body })
}

pub fn extract_footer(root: &Element) -> Vec<String> {
    let Some(footer) = root.find_class("footer") else {
        return Vec::new();
    };
    ["footer-message", "footer-website"]
        .into_iter()
        .filter_map(|class| footer.find_class(class).and_then(|e| non_empty(e.text())))
        .collect()
}
