//! Symbol normalization between local listings and the price provider.
//!
//! Local exchanges and price providers spell share-class tickers
//! differently: the Buenos Aires listing of Berkshire class B is `BRK.B`,
//! while Yahoo expects `BRK-B`. The normalizer swaps the class separator
//! and nothing else.

use serde::{Deserialize, Serialize};

/// Default class separator used by local listings.
pub const LOCAL_SEPARATOR: char = '.';

/// Default class separator used by the price provider.
pub const ORACLE_SEPARATOR: char = '-';

/// Bidirectional local <-> provider symbol mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolNormalizer {
    local_separator: char,
    oracle_separator: char,
}

impl Default for SymbolNormalizer {
    fn default() -> Self {
        Self::new(LOCAL_SEPARATOR, ORACLE_SEPARATOR)
    }
}

impl SymbolNormalizer {
    pub fn new(local_separator: char, oracle_separator: char) -> Self {
        Self {
            local_separator,
            oracle_separator,
        }
    }

    /// Map a local listing symbol to the provider's convention.
    ///
    /// ```
    /// use cedearfolio_market_data::SymbolNormalizer;
    ///
    /// let normalizer = SymbolNormalizer::default();
    /// assert_eq!(normalizer.to_oracle_symbol("BRK.B"), "BRK-B");
    /// ```
    pub fn to_oracle_symbol(&self, local_symbol: &str) -> String {
        Self::swap(local_symbol, self.local_separator, self.oracle_separator)
    }

    /// Map a provider symbol back to the local listing convention.
    pub fn from_oracle_symbol(&self, oracle_symbol: &str) -> String {
        Self::swap(oracle_symbol, self.oracle_separator, self.local_separator)
    }

    fn swap(symbol: &str, from: char, to: char) -> String {
        symbol
            .chars()
            .map(|c| if c == from { to } else { c })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_symbol_passes_through() {
        let normalizer = SymbolNormalizer::default();
        assert_eq!(normalizer.to_oracle_symbol("AAPL"), "AAPL");
        assert_eq!(normalizer.from_oracle_symbol("AAPL"), "AAPL");
    }

    #[test]
    fn test_class_separator_is_swapped() {
        let normalizer = SymbolNormalizer::default();
        assert_eq!(normalizer.to_oracle_symbol("BRK.B"), "BRK-B");
        assert_eq!(normalizer.from_oracle_symbol("BRK-B"), "BRK.B");
    }

    #[test]
    fn test_unknown_characters_pass_through() {
        let normalizer = SymbolNormalizer::default();
        assert_eq!(normalizer.to_oracle_symbol("^GSPC"), "^GSPC");
        assert_eq!(normalizer.to_oracle_symbol("MELI/D"), "MELI/D");
    }

    #[test]
    fn test_case_and_spacing_are_preserved() {
        let normalizer = SymbolNormalizer::default();
        assert_eq!(normalizer.to_oracle_symbol("brk.b"), "brk-b");
        assert_eq!(normalizer.from_oracle_symbol(&normalizer.to_oracle_symbol("brk.b")), "brk.b");
        assert_eq!(normalizer.to_oracle_symbol(" BRK.B "), " BRK-B ");
    }

    #[test]
    fn test_round_trip() {
        let normalizer = SymbolNormalizer::default();
        for symbol in ["AAPL", "BRK.B", "BF.B", "KO", "X.Y.Z", "", "brk.b", "Bf.b2"] {
            let oracle = normalizer.to_oracle_symbol(symbol);
            assert_eq!(normalizer.from_oracle_symbol(&oracle), symbol);
        }
    }

    #[test]
    fn test_custom_separators() {
        let normalizer = SymbolNormalizer::new('/', '.');
        assert_eq!(normalizer.to_oracle_symbol("BRK/B"), "BRK.B");
        assert_eq!(normalizer.from_oracle_symbol("BRK.B"), "BRK/B");
    }
}
