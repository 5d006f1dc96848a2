use chrono::NaiveDate;

/// Calendar-day key in `yyyy-mm-dd` form. All reporting-window comparisons
/// operate on these keys rather than on `DateTime` instants, so a stored
/// date string can never shift by a day through timezone conversion.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Accepts ISO (`yyyy-mm-dd`) and Brazilian (`dd/mm/yyyy`) textual dates,
/// then falls back to salvaging the date portion of a timestamp-like
/// string (`yyyy-mm-ddTHH:MM:SS`).
pub fn parse_flexible(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Some(d);
    }
    if let Some(prefix) = s.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(d);
        }
    }

    None
}

/// Inclusive reporting-window membership with either bound optional.
pub fn in_range(date: NaiveDate, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    let key = date_key(date);
    if let Some(from) = from {
        if key < date_key(from) {
            return false;
        }
    }
    if let Some(to) = to {
        if key > date_key(to) {
            return false;
        }
    }
    true
}
