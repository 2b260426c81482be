//! Vietnamese transcript normalization.
//!
//! Spoken numbers become digits when they measure something (`một giờ` →
//! `1 giờ`, `mười lăm phút` → `15 phút`) or when a compound number ends the
//! transcript (`hai mươi` → `20`). Common alternate spellings are folded into
//! the forms downstream intent matching expects.

/// Number words with their unit value.
const NUMBER_UNITS: &[(&str, u64)] = &[
    ("không", 0),
    ("một", 1),
    ("mốt", 1),
    ("hai", 2),
    ("ba", 3),
    ("bốn", 4),
    ("tư", 4),
    ("năm", 5),
    ("lăm", 5),
    ("sáu", 6),
    ("bảy", 7),
    ("tám", 8),
    ("chín", 9),
];

const TEN: &str = "mười";
const TENS: &str = "mươi";
const HUNDRED: &str = "trăm";
const ZERO_LINKS: [&str; 2] = ["linh", "lẻ"];
const ZERO: &str = "không";
const PERCENT: &str = "phần";

/// Words that make a preceding number run a quantity.
const FOLLOWERS: [&str; 9] = [
    "giờ", "phút", "giây", "ngày", "tháng", "năm", "độ", PERCENT, "rưỡi",
];

/// Spelling variants folded before number conversion, in order.
const SPELLING_VARIANTS: [(&str, &str); 5] = [
    ("tivi", "tv"),
    ("ti vi", "tv"),
    ("ti-vi", "tv"),
    ("ti. vi", "tv"),
    ("ga ra", "gara"),
];

fn unit_value(word: &str) -> Option<u64> {
    NUMBER_UNITS
        .iter()
        .find(|(w, _)| *w == word)
        .map(|&(_, v)| v)
}

fn is_number_word(word: &str) -> bool {
    word == TEN
        || word == TENS
        || word == HUNDRED
        || ZERO_LINKS.contains(&word)
        || unit_value(word).is_some()
}

/// Value of a run of number words, or `None` if it overflows.
fn run_value(words: &[&str]) -> Option<u64> {
    let mut total: u64 = 0;
    let mut value_set = false;

    for &word in words {
        if word == TEN {
            total = if total == 0 { 10 } else { total.checked_add(10)? };
        } else if word == TENS {
            total = total.max(1).checked_mul(10)?;
        } else if word == HUNDRED {
            total = total.max(1).checked_mul(100)?;
        } else if ZERO_LINKS.contains(&word) {
            // "linh"/"lẻ" only mark that a value has started
        } else {
            let unit = unit_value(word)?;
            total = if total >= 10 || value_set {
                total.checked_add(unit)?
            } else {
                unit
            };
        }
        value_set = true;
    }

    value_set.then_some(total)
}

/// Replace spoken number runs with digits where they denote a quantity.
pub fn normalize_numbers(text: &str) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return text.to_string();
    }

    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if !is_number_word(tokens[i]) {
            out.push(tokens[i].to_string());
            i += 1;
            continue;
        }

        let mut j = i;
        while j < tokens.len() && is_number_word(tokens[j]) {
            j += 1;
        }
        let run = &tokens[i..j];
        let value = run_value(run);
        let next = tokens.get(j).copied();
        let prev = i.checked_sub(1).map(|p| tokens[p]);

        let quantity = match next {
            Some(word) => FOLLOWERS.contains(&word),
            None => value.is_some_and(|v| v >= 10),
        };
        let excluded = run == [ZERO] || (run == [HUNDRED] && prev == Some(PERCENT));

        match value {
            Some(v) if quantity && !excluded => {
                out.push(v.to_string());
                i = j;
            }
            None => {
                out.extend(run.iter().map(|w| (*w).to_string()));
                i = j;
            }
            Some(_) => {
                out.push(tokens[i].to_string());
                i += 1;
            }
        }
    }

    out.join(" ")
}

/// Fold `hủy` to the `huỷ` spelling.
pub fn normalize_cancellation_terms(text: &str) -> String {
    text.replace("hủy", "huỷ").replace("Hủy", "Huỷ")
}

/// Full Vietnamese normalization: whitespace, spelling variants, numbers,
/// cancellation terms. Applying it twice changes nothing further.
pub fn normalize_transcript(text: &str) -> String {
    let mut normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    for (from, to) in SPELLING_VARIANTS {
        normalized = normalized.replace(from, to);
    }
    let normalized = normalize_numbers(&normalized);
    normalize_cancellation_terms(&normalized)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
