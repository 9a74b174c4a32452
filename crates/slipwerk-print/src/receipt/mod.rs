// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Receipt pipeline: job HTML -> ReceiptModel -> fixed-width text.

pub mod html;
pub mod layout;
pub mod model;

pub use layout::{LINE_WIDTH, convert_currency, format_line, format_total_line, render};
pub use model::ReceiptModel;

/// Extract and lay out a receipt in one step.
///
/// Returns an empty string when the content holds no recognised section.
pub fn html_to_text(content: &str) -> String {
    render(&ReceiptModel::from_html(content))
}

#[cfg(test)]
pub(crate) const SAMPLE_RECEIPT: &str = r#"
    <div class="receipt">
      <div class="title">CAFE MODA</div>
      <div class="order-info">
        <div class="info-line"><strong>Masa:</strong> 12</div>
        <div class="info-line"><strong>Garson</strong> Ayşe</div>
        <div class="info-line">Paket servis</div>
      </div>
      <div class="divider"></div>
      <div class="item-row header"><span>ÜRÜN</span><span>ADET</span><span>TUTAR</span></div>
      <div class="item-row"><span>Cola</span><span>2</span><span>₺20</span></div>
      <div class="item-row"><span>Türk Kahvesi Orta Şekerli</span><span>1</span><span>45,00</span></div>
      <div class="item-row"><span></span><span>1</span><span>5</span></div>
      <div class="divider"></div>
      <div class="totals">
        <div class="total-row"><span>Ara Toplam</span><span>₺65,00</span></div>
        <div class="grand-total-row"><span>TOPLAM</span><span>₺65,00</span></div>
      </div>
      <div class="divider"></div>
      <div class="payments">
        <div class="section-title">ÖDEME BİLGİLERİ</div>
        <div class="payment-row"><span>Nakit</span><span>₺100</span></div>
        <div class="change-line"><span>Para Üstü</span><span>₺35</span></div>
      </div>
      <div class="divider"></div>
      <div class="order-notes-section">
        <div class="section-title">SİPARİŞ NOTU</div>
        <div class="order-notes">Acısız olsun</div>
      </div>
      <div class="divider"></div>
      <div class="footer">
        <div class="footer-message">Afiyet olsun!</div>
        <div class="footer-website">www.cafemoda.example</div>
      </div>
    </div>
"#;
