//! MAC address normalisation

/// Lowercase colon-separated form of a MAC address
///
/// Accepts `AA:BB:CC:DD:EE:FF`, `AA-BB-CC-DD-EE-FF`, `aabb.ccdd.eeff` and
/// bare 12-digit hex. Anything else is returned unchanged.
pub fn format_mac(mac: &str) -> String {
    let len = mac.len();
    let count = |sep: char| mac.matches(sep).count();

    if len == 17 && count(':') == 5 {
        return mac.to_lowercase();
    }

    let compact = if len == 17 && count('-') == 5 {
        mac.replace('-', "")
    } else if len == 14 && count('.') == 2 {
        mac.replace('.', "")
    } else {
        mac.to_string()
    };

    if compact.len() != 12 || !compact.is_ascii() {
        return mac.to_string();
    }

    let lower = compact.to_lowercase();
    lower
        .as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}
