//! Russian rendering of English pre-order dates

use crate::domain::ALREADY_AVAILABLE;
use once_cell::sync::Lazy;
use regex::Regex;

const MONTHS_EN: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Month names used without a day ("Март 2026")
const MONTHS_NOMINATIVE: [&str; 12] = [
    "Январь",
    "Февраль",
    "Март",
    "Апрель",
    "Май",
    "Июнь",
    "Июль",
    "Август",
    "Сентябрь",
    "Октябрь",
    "Ноябрь",
    "Декабрь",
];

/// Month names following a day ("21 Марта 2026")
const MONTHS_GENITIVE: [&str; 12] = [
    "Января",
    "Февраля",
    "Марта",
    "Апреля",
    "Мая",
    "Июня",
    "Июля",
    "Августа",
    "Сентября",
    "Октября",
    "Ноября",
    "Декабря",
];

static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z]+)\s+(\d{1,2}),?\s+(\d{4})").expect("month-day-year pattern is valid")
});

static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z]+)\s+(\d{4})").expect("month-year pattern is valid"));

fn month_index(name: &str) -> Option<usize> {
    let name = name.to_lowercase();
    MONTHS_EN.iter().position(|m| *m == name)
}

/// Localize a pre-order date.
///
/// "March 21, 2026" becomes "21 Марта 2026", "MARCH 2026" becomes
/// "Март 2026". Text matching neither form is returned unchanged; only an
/// empty input yields the "already available" sentinel.
pub fn localize_release_date(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ALREADY_AVAILABLE.to_string();
    }

    if let Some(caps) = MONTH_DAY_YEAR.captures(trimmed) {
        if let Some(i) = month_index(&caps[1]) {
            return format!("{} {} {}", &caps[2], MONTHS_GENITIVE[i], &caps[3]);
        }
    }

    if let Some(caps) = MONTH_YEAR.captures(trimmed) {
        if let Some(i) = month_index(&caps[1]) {
            return format!("{} {}", MONTHS_NOMINATIVE[i], &caps[2]);
        }
    }

    text.to_string()
}
