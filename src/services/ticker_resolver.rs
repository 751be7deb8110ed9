//! Ticker inference from the free-text names carried by the document feed.
//!
//! The feed has no reliable ticker field, so the code is guessed from the
//! display name first and the long registered name second. Strategies run in
//! a fixed order and the first hit wins; the order is legacy behaviour and is
//! pinned by tests rather than by any rationale.

use std::sync::OnceLock;

use regex::Regex;

const SUFFIX: &str = "11";
const PREFIXES: [&str; 2] = ["FII ", "FIAGRO "];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub ticker: String,
    pub strategy: &'static str,
}

/// Normalised inputs shared by every strategy.
pub struct Names {
    display: String,
    long: String,
}

impl Names {
    fn new(display_name: &str, long_form_name: &str) -> Self {
        let mut display = display_name.trim().to_uppercase();
        for p in PREFIXES {
            if let Some(rest) = display.strip_prefix(p) {
                display = rest.trim().to_string();
                break;
            }
        }

        Self {
            display,
            long: long_form_name.trim().to_uppercase(),
        }
    }
}

pub struct Strategy {
    pub name: &'static str,
    apply: fn(&Names) -> Option<String>,
}

static STRATEGIES: [Strategy; 7] = [
    Strategy { name: "display_full_ticker", apply: display_full_ticker },
    Strategy { name: "display_bare_code", apply: display_bare_code },
    Strategy { name: "display_tokens", apply: display_tokens },
    Strategy { name: "long_code_before_fundo", apply: long_code_before_fundo },
    Strategy { name: "long_fii_prefix", apply: long_fii_prefix },
    Strategy { name: "long_leading_letters", apply: long_leading_letters },
    Strategy { name: "long_acronym", apply: long_acronym },
];

/// Names of the strategies in the order they are tried.
pub fn strategy_order() -> Vec<&'static str> {
    STRATEGIES.iter().map(|s| s.name).collect()
}

pub fn resolve(display_name: &str, long_form_name: &str) -> Option<String> {
    resolve_with_strategy(display_name, long_form_name).map(|r| r.ticker)
}

pub fn resolve_with_strategy(display_name: &str, long_form_name: &str) -> Option<Resolution> {
    let names = Names::new(display_name, long_form_name);

    for s in STRATEGIES.iter() {
        if let Some(ticker) = (s.apply)(&names) {
            tracing::debug!(strategy = s.name, %ticker, display_name, "ticker resolved");
            return Some(Resolution {
                ticker,
                strategy: s.name,
            });
        }
    }

    tracing::debug!(display_name, long_form_name, "ticker unresolved");
    None
}

fn re(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap_or_else(|e| panic!("bad pattern {pattern}: {e}")))
}

fn first_capture(regex: &Regex, haystack: &str) -> Option<String> {
    regex
        .captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().chars().take(4).collect())
}

fn display_full_ticker(n: &Names) -> Option<String> {
    static FULL: OnceLock<Regex> = OnceLock::new();
    re(&FULL, r"^[A-Z]{4}\d{2}$")
        .is_match(&n.display)
        .then(|| n.display.clone())
}

fn display_bare_code(n: &Names) -> Option<String> {
    static BARE: OnceLock<Regex> = OnceLock::new();
    re(&BARE, r"^[A-Z]{4,5}$")
        .is_match(&n.display)
        .then(|| format!("{}{SUFFIX}", n.display))
}

// "HGI CRI" => "HGIC"
fn display_tokens(n: &Names) -> Option<String> {
    let mut tokens = n.display.split_whitespace();
    let first = tokens.next()?;
    let second = tokens.next()?;

    let mut code: String = first
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(4)
        .collect();
    code.push(second.chars().find(|c| c.is_ascii_alphanumeric())?);

    let code: String = code.chars().take(4).collect();
    if code.len() == 4 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Some(format!("{code}{SUFFIX}"))
    } else {
        None
    }
}

fn long_code_before_fundo(n: &Names) -> Option<String> {
    static FUNDO: OnceLock<Regex> = OnceLock::new();
    first_capture(re(&FUNDO, r"\b([A-Z]{4})\s+FUNDO\b"), &n.long).map(|c| format!("{c}{SUFFIX}"))
}

fn long_fii_prefix(n: &Names) -> Option<String> {
    static FII: OnceLock<Regex> = OnceLock::new();
    first_capture(re(&FII, r"\bFII\s+([A-Z]{4,6})\b"), &n.long).map(|c| format!("{c}{SUFFIX}"))
}

fn long_leading_letters(n: &Names) -> Option<String> {
    static LEADING: OnceLock<Regex> = OnceLock::new();
    first_capture(re(&LEADING, r"^([A-Z]{4,6})\b"), &n.long).map(|c| format!("{c}{SUFFIX}"))
}

fn long_acronym(n: &Names) -> Option<String> {
    let initials: Vec<char> = n
        .long
        .split_whitespace()
        .filter_map(|w| w.chars().next())
        .filter(|c| c.is_ascii_alphabetic())
        .take(4)
        .collect();

    if initials.len() < 2 {
        return None;
    }

    let mut code: String = initials.into_iter().collect();
    while code.len() < 4 {
        code.push('X');
    }

    Some(format!("{code}{SUFFIX}"))
}
