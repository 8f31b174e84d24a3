//! File layout for the columnar store: one Parquet file plus one JSON
//! sidecar per `(symbol, year)`, under `<data_root>/<sanitized symbol>/`.

use std::path::{Path, PathBuf};

/// Strips a leading `/` (common on perpetual-futures symbols like
/// `/ESZ4`) and removes any remaining `/` so the symbol is safe to use as
/// a directory component.
pub fn sanitize_symbol(symbol: &str) -> String {
    symbol.trim_start_matches('/').replace('/', "")
}

pub fn symbol_dir(data_root: &Path, symbol: &str) -> PathBuf {
    data_root.join(sanitize_symbol(symbol))
}

pub fn year_file_path(data_root: &Path, symbol: &str, year: i32) -> PathBuf {
    symbol_dir(data_root, symbol).join(format!("{year}.parquet"))
}

pub fn metadata_path(data_root: &Path, symbol: &str, year: i32) -> PathBuf {
    symbol_dir(data_root, symbol).join(format!("{year}_meta.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_leading_slash_and_inner_slashes() {
        assert_eq!(sanitize_symbol("/ESZ4"), "ESZ4");
        assert_eq!(sanitize_symbol("BTC/USDT"), "BTCUSDT");
        assert_eq!(sanitize_symbol("AAPL"), "AAPL");
    }

    #[test]
    fn test_file_paths_are_scoped_under_sanitized_symbol_dir() {
        let root = Path::new("/data");
        assert_eq!(
            year_file_path(root, "/ESZ4", 2024),
            Path::new("/data/ESZ4/2024.parquet")
        );
        assert_eq!(
            metadata_path(root, "/ESZ4", 2024),
            Path::new("/data/ESZ4/2024_meta.json")
        );
    }
}
