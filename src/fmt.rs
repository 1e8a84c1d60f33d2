fn group_thousands(int_part: &str) -> String {
    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format an amount with thousands separators and no decimals: 1,234,567
pub fn amount(val: f64) -> String {
    let rounded = format!("{:.0}", val.abs());
    let sign = if val < 0.0 && rounded != "0" { "-" } else { "" };
    format!("{sign}{}", group_thousands(&rounded))
}

/// Optional amount; missing shows as a dash.
pub fn amount_or_dash(val: Option<f64>) -> String {
    val.map_or_else(|| "-".to_string(), amount)
}

/// Format a count with thousands separators: 12,345
pub fn count(val: usize) -> String {
    group_thousands(&val.to_string())
}

/// Format a percentage with one decimal: 66.7%
pub fn pct(val: f64) -> String {
    format!("{val:.1}%")
}

/// Human-readable file size: 512 B, 1.5 KB, 2.0 MB
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_formatting() {
        assert_eq!(amount(1234.56), "1,235");
        assert_eq!(amount(-500.0), "-500");
        assert_eq!(amount(0.0), "0");
        assert_eq!(amount(-0.2), "0");
        assert_eq!(amount(1000000.0), "1,000,000");
        assert_eq!(amount_or_dash(None), "-");
    }

    #[test]
    fn test_count_and_pct() {
        assert_eq!(count(999), "999");
        assert_eq!(count(12345), "12,345");
        assert_eq!(pct(200.0 / 3.0), "66.7%");
        assert_eq!(pct(100.0), "100.0%");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(2 * 1024 * 1024), "2.0 MB");
    }
}
