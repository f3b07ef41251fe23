//! Universe ranking: composite score of every security on its latest bar.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use momentumlab_core::domain::ProfileName;
use momentumlab_core::indicators::compute_indicators;
use momentumlab_core::prices::{EntrySource, PriceResolver, TargetSource};
use momentumlab_core::ranking::{RankRecord, RankingScorer, RANKING_MIN_HITS};
use momentumlab_core::scoring::BenfordParams;

use crate::config::EngineConfig;
use crate::data_loader::LoadedData;

/// Shortest series worth ranking.
pub const MIN_RANK_BARS: usize = 62;

/// One ranked security.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedSecurity {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: f64,
    pub profile: ProfileName,
    pub entry_price: f64,
    pub entry_source: EntrySource,
    /// `None` when no target rule matched.
    pub target_price: Option<f64>,
    pub target_source: TargetSource,
    #[serde(flatten)]
    pub record: RankRecord,
}

/// Rank the universe in parallel, best composite first, keeping the top N.
///
/// Series shorter than [`MIN_RANK_BARS`], outside the price filters, or
/// with a zero composite are left out. Benford window and influence come
/// from the configuration; min hits is the scanner's 3.
pub fn rank_universe(universe: &[LoadedData], config: &EngineConfig) -> Vec<RankedSecurity> {
    let selection = config.profile_selection();
    let benford = BenfordParams {
        min_hits: RANKING_MIN_HITS,
        ..config.benford
    };
    let resolver = PriceResolver::default();

    let mut ranked: Vec<RankedSecurity> = universe
        .par_iter()
        .filter_map(|data| {
            let bars = &data.bars;
            if bars.len() < MIN_RANK_BARS {
                return None;
            }
            let idx = bars.len() - 1;
            let last = &bars[idx];
            if !config.universe.accepts_price(last.close) {
                return None;
            }

            let profile = selection.resolve(bars);
            let name = profile.name;
            let frame = compute_indicators(bars);
            let scorer = RankingScorer::with_benford(profile, config.signal.threshold, benford);
            let record = scorer.rank(bars, &frame, idx)?;
            if record.composite <= 0.0 {
                return None;
            }
            let prices = resolver.resolve(bars, &frame, idx);

            Some(RankedSecurity {
                symbol: data.symbol.clone(),
                date: last.date,
                close: last.close,
                profile: name,
                entry_price: prices.entry,
                entry_source: prices.entry_source,
                target_price: prices.target_anchor,
                target_source: prices.target_source,
                record,
            })
        })
        .collect();

    // Stable sort keeps universe order among equal composites.
    ranked.sort_by(|a, b| b.record.composite.total_cmp(&a.record.composite));
    ranked.truncate(config.universe.top_n);

    info!(
        universe = universe.len(),
        ranked = ranked.len(),
        investable = ranked.iter().filter(|r| r.record.investable).count(),
        "universe ranked"
    );
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::{generate_synthetic_bars, DataSource};

    fn synthetic(symbol: &str, n: usize) -> LoadedData {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = generate_synthetic_bars(symbol, start, n);
        LoadedData::from_bars(symbol, bars, DataSource::Synthetic)
    }

    fn universe() -> Vec<LoadedData> {
        ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF", "GGG", "HHH"]
            .iter()
            .map(|s| synthetic(s, 250))
            .collect()
    }

    #[test]
    fn short_series_are_skipped() {
        let data = vec![synthetic("SHORT", 61)];
        assert!(rank_universe(&data, &EngineConfig::default()).is_empty());
    }

    #[test]
    fn sorted_descending_and_truncated() {
        let mut config = EngineConfig::default();
        config.universe.top_n = 3;
        let ranked = rank_universe(&universe(), &config);
        assert!(ranked.len() <= 3);
        for pair in ranked.windows(2) {
            assert!(pair[0].record.composite >= pair[1].record.composite);
        }
        for r in &ranked {
            assert!(r.record.composite > 0.0);
            assert!(r.entry_price > 0.0);
        }
    }

    #[test]
    fn price_filter_excludes_by_last_close() {
        let data = universe();
        let mut config = EngineConfig::default();
        config.universe.price_max = 1.0;
        assert!(rank_universe(&data, &config).is_empty());

        let floor = data
            .iter()
            .map(|d| d.bars[d.bars.len() - 1].close)
            .fold(f64::INFINITY, f64::min);
        config.universe.price_max = 0.0;
        config.universe.price_min = floor;
        for r in rank_universe(&data, &config) {
            assert!(r.close >= floor);
        }
    }

    #[test]
    fn ranking_is_deterministic() {
        let data = universe();
        let config = EngineConfig::default();
        let symbols = |ranked: Vec<RankedSecurity>| -> Vec<String> {
            ranked.into_iter().map(|r| r.symbol).collect()
        };
        let a = symbols(rank_universe(&data, &config));
        let b = symbols(rank_universe(&data, &config));
        assert_eq!(a, b);
    }
}
