// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fixed-width text layout for 80mm slip printers (32 columns).
//
// Widths are counted in characters, not bytes: the text is encoded to a
// single-byte code page before it reaches the printer.

use super::model::{InfoLine, ItemRow, LabeledAmount, ReceiptModel};

/// Printable characters per line.
pub const LINE_WIDTH: usize = 32;

/// Item row column widths: name, quantity, amount.
const ITEM_COLUMNS: (usize, usize, usize) = (16, 5, 9);

/// Total row column widths: label, amount.
const TOTAL_COLUMNS: (usize, usize) = (18, 13);

/// Currency glyph stripped from amounts.
const CURRENCY_GLYPH: char = '₺';

/// Suffix appended to bare numeric amounts.
const DEFAULT_CURRENCY: &str = "TL";

/// Suffixes that mark an amount as already carrying a currency.
const KNOWN_CURRENCIES: &[&str] = &["TL", "USD", "EUR", "GBP"];

fn truncate(s: &str, width: usize) -> &str {
    match s.char_indices().nth(width) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn pad_end(s: &str, width: usize) -> String {
    format!("{s:<width$}")
}

fn pad_start(s: &str, width: usize) -> String {
    format!("{s:>width$}")
}

/// Three-column item row: name left-aligned and truncated to 16, quantity
/// right-aligned in 5, amount right-aligned in 9.
pub fn format_line(name: &str, quantity: &str, amount: &str) -> String {
    let (w1, w2, w3) = ITEM_COLUMNS;
    let mut line = pad_end(truncate(name, w1), w1);
    line.push_str(&pad_start(quantity, w2));
    line.push_str(&pad_start(amount, w3));
    line
}

/// Two-column total row: label left-aligned and truncated to 18, one space,
/// amount right-aligned in 13.  Fills the full line width.
pub fn format_total_line(label: &str, amount: &str) -> String {
    let (w1, w2) = TOTAL_COLUMNS;
    let mut line = pad_end(truncate(label, w1), w1);
    line.push(' ');
    line.push_str(&pad_start(amount, w2));
    line
}

/// Strip the local currency glyph and append the default suffix to a bare
/// number (`"₺20"` → `"20 TL"`). Values that already name a currency, or
/// that are not numeric once stripped, are returned trimmed but otherwise
/// unchanged.
pub fn convert_currency(text: &str) -> String {
    let stripped: String = text.chars().filter(|&c| c != CURRENCY_GLYPH).collect();
    let value = stripped.trim();

    if KNOWN_CURRENCIES.iter().any(|cur| value.ends_with(cur)) || !is_bare_number(value) {
        return value.to_string();
    }
    format!("{value} {DEFAULT_CURRENCY}")
}

/// Digits with optional grouping/decimal separators and sign.
fn is_bare_number(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-' | ' '))
}

fn rule(ch: char) -> String {
    ch.to_string().repeat(LINE_WIDTH)
}

fn item_line(row: &ItemRow) -> String {
    format_line(&row.name, &row.quantity, &convert_currency(&row.amount))
}

fn amount_line(row: &LabeledAmount) -> String {
    format_total_line(&row.label, &convert_currency(&row.amount))
}

/// Lay out the receipt as newline-separated 32-column text.
///
/// Section order: `=`-ruled title, info lines, column header, items, totals,
/// payments, notes, footer, with `-` rules between sections.  An empty model
/// renders as an empty string.
pub fn render(model: &ReceiptModel) -> String {
    if model.is_empty() {
        return String::new();
    }

    let mut out: Vec<String> = Vec::new();

    if let Some(title) = &model.title {
        out.push(rule('='));
        out.push(title.clone());
        out.push(rule('='));
    }

    out.extend(model.info.iter().map(InfoLine::render));
    out.push(rule('-'));

    if let Some(header) = &model.header {
        out.push(format_line(&header.name, &header.quantity, &header.amount));
        out.push(rule('-'));
    }

    out.extend(model.items.iter().map(item_line));
    out.push(rule('-'));

    out.extend(model.totals.iter().map(amount_line));
    out.push(rule('-'));

    if let Some(payments) = &model.payments {
        if let Some(title) = &payments.title {
            out.push(title.clone());
            out.push(rule('-'));
        }
        out.extend(payments.rows.iter().map(amount_line));
        if let Some(change) = &payments.change {
            out.push(amount_line(change));
        }
        out.push(rule('-'));
    }

    if let Some(notes) = &model.notes {
        for part in [&notes.title, &notes.body].into_iter().flatten() {
            out.push(part.clone());
            out.push(rule('-'));
        }
    }

    out.extend(model.footer.iter().cloned());

    out.join("\n")
}
