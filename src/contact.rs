// 📞 Contact helpers - what the call / chat / share buttons need
//
// The core only exposes the Business record; these produce the outbound
// payloads the card buttons hand to the platform.

use crate::catalog::Business;
use crate::selection;

/// Country calling code used for chat links
pub const COUNTRY_CODE: &str = "91";

/// Greeting prefilled in the chat app
pub const GREETING: &str = "नमस्कार, मी “जवळा व्यवसाय निर्देशिका” वरून आपला संपर्क घेतला आहे.";

/// Ten digits -> "XXXX XXX XXX"; anything else passes through unchanged
pub fn format_phone_number(number: &str) -> String {
    let chars: Vec<char> = number.chars().collect();
    if chars.len() != 10 {
        return number.to_string();
    }

    let part = |range: std::ops::Range<usize>| chars[range].iter().collect::<String>();
    format!("{} {} {}", part(0..4), part(4..7), part(7..10))
}

pub fn tel_uri(business: &Business) -> String {
    format!("tel:{}", business.contact_number)
}

pub fn whatsapp_uri(business: &Business) -> String {
    format!(
        "https://wa.me/{}{}?text={}",
        COUNTRY_CODE,
        business.contact_number,
        urlencoding::encode(GREETING)
    )
}

/// Clipboard payload
pub fn share_text(business: &Business, site_url: &str) -> String {
    format!(
        "{}\nमालक: {}\nसंपर्क: {}\n\nजवळा व्यवसाय निर्देशिका – {}",
        business.shop_name,
        business.owner_name,
        format_phone_number(&business.contact_number),
        site_url
    )
}

/// Link that opens the directory filtered to the business's category
pub fn share_url(business: &Business, origin: &str) -> String {
    format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        selection::encode(Some(&business.category))
    )
}

// ============================================================================
// TESTS
// ============================================================================
