use std::borrow::Cow;

/// Yahoo suffix for National Stock Exchange of India listings.
pub const NSE_SUFFIX: &str = ".NS";

/// Yahoo suffix for BSE (Bombay Stock Exchange) listings.
pub const BSE_SUFFIX: &str = ".BO";

/// Two market suffixes under which the same base ticker is usually listed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SuffixPair {
    pub primary: Cow<'static, str>,
    pub secondary: Cow<'static, str>,
}

impl SuffixPair {
    pub const fn new(primary: &'static str, secondary: &'static str) -> Self {
        Self {
            primary: Cow::Borrowed(primary),
            secondary: Cow::Borrowed(secondary),
        }
    }

    /// Returns (base, matched, sibling) if `symbol` ends with one of the suffixes.
    fn split<'a, 's>(&'s self, symbol: &'a str) -> Option<(&'a str, &'s str, &'s str)> {
        if let Some(base) = symbol.strip_suffix(self.primary.as_ref()) {
            return Some((base, self.primary.as_ref(), self.secondary.as_ref()));
        }
        if let Some(base) = symbol.strip_suffix(self.secondary.as_ref()) {
            return Some((base, self.secondary.as_ref(), self.primary.as_ref()));
        }
        None
    }
}

/// Derives fallback spellings for a canonical symbol.
///
/// Only whitelisted suffixes are recognised, so share classes such as
/// `BRK.B` pass through untouched.
#[derive(Clone, Debug)]
pub struct VariantGenerator {
    pairs: Vec<SuffixPair>,
}

impl Default for VariantGenerator {
    fn default() -> Self {
        Self::new(vec![SuffixPair::new(NSE_SUFFIX, BSE_SUFFIX)])
    }
}

impl VariantGenerator {
    pub fn new(pairs: Vec<SuffixPair>) -> Self {
        Self { pairs }
    }

    /// Ordered variants to try, highest confidence first.
    ///
    /// The input's own suffix comes first, its sibling second. Symbols
    /// without a recognised suffix yield themselves only.
    pub fn generate(&self, symbol: &str) -> Vec<String> {
        for pair in &self.pairs {
            if let Some((base, own, sibling)) = pair.split(symbol) {
                if base.is_empty() {
                    break;
                }
                return vec![format!("{}{}", base, own), format!("{}{}", base, sibling)];
            }
        }
        vec![symbol.to_string()]
    }

    /// Strip a recognised market suffix, leaving other symbols as-is.
    pub fn strip_suffix<'a>(&self, symbol: &'a str) -> &'a str {
        for pair in &self.pairs {
            if let Some((base, _, _)) = pair.split(symbol) {
                if !base.is_empty() {
                    return base;
                }
            }
        }
        symbol
    }

    /// Append `suffix` unless the symbol already carries it or another
    /// recognised suffix.
    pub fn with_suffix(&self, symbol: &str, suffix: &str) -> String {
        if suffix.is_empty() || symbol.ends_with(suffix) || self.strip_suffix(symbol) != symbol {
            symbol.to_string()
        } else {
            format!("{}{}", symbol, suffix)
        }
    }
}
