// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for receipt extraction, fixed-width layout, and CP857
// encoding in the slipwerk-print crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use slipwerk_print::codepage::encode_or_utf8;
use slipwerk_print::receipt::{ReceiptModel, html_to_text, render};

// ---------------------------------------------------------------------------
// Helper: build a receipt with `items` item rows
// ---------------------------------------------------------------------------

fn build_receipt(items: usize) -> String {
    let mut html = String::from(
        r#"<html><body>
        <div class="title">CAFE MODA</div>
        <div class="order-info"><strong>Masa</strong> 12 <strong>Garson</strong> Ayşe</div>
        <div class="item-row"><span>ÜRÜN</span><span>ADET</span><span>TUTAR</span></div>"#,
    );
    for i in 0..items {
        html.push_str(&format!(
            r#"<div class="item-row"><span>Türk Kahvesi &amp; Lokum {i}</span><span>{}</span><span>₺{},50</span></div>"#,
            i % 4 + 1,
            i * 3 + 10
        ));
    }
    html.push_str(
        r#"<div class="totals">
            <div class="total-row"><span>TOPLAM</span><span>₺1.250,00</span></div>
        </div>
        <div class="footer"><div class="footer-message">Afiyet olsun!</div></div>
        </body></html>"#,
    );
    html
}

/// Benchmark HTML extraction into the receipt model.
fn bench_extract(c: &mut Criterion) {
    let small = build_receipt(5);
    let large = build_receipt(200);

    c.bench_function("ReceiptModel::from_html (5 items)", |b| {
        b.iter(|| black_box(ReceiptModel::from_html(black_box(&small))));
    });

    c.bench_function("ReceiptModel::from_html (200 items)", |b| {
        b.iter(|| black_box(ReceiptModel::from_html(black_box(&large))));
    });
}

/// Benchmark 32-column layout of an already extracted model.
fn bench_render(c: &mut Criterion) {
    let model = ReceiptModel::from_html(&build_receipt(50));
    c.bench_function("render (50 items)", |b| {
        b.iter(|| black_box(render(black_box(&model))));
    });
}

/// Benchmark the full HTML to CP857 bytes path used per slip job.
fn bench_html_to_cp857(c: &mut Criterion) {
    let html = build_receipt(50);
    c.bench_function("html_to_text + encode_cp857 (50 items)", |b| {
        b.iter(|| {
            let text = html_to_text(black_box(&html));
            let encoded = encode_or_utf8(&text);
            assert!(!encoded.utf8_fallback);
            black_box(encoded.bytes);
        });
    });
}

criterion_group!(benches, bench_extract, bench_render, bench_html_to_cp857);
criterion_main!(benches);
