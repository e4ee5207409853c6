use crate::error::OptimizerError;
use configuration::StrategyConfig;
use itertools::Itertools;

/// One (buy, sell) threshold pair, as fractions of the respective moving averages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub buy: f64,
    pub sell: f64,
}

/// Generates every (buy, sell) pair: buy ascending in the outer loop, sell ascending inside.
///
/// This order is what makes "first seen wins" prefer the lowest buy threshold, then the
/// lowest sell threshold, among equal returns.
pub fn generate_grid(config: &StrategyConfig) -> Result<Vec<GridCell>, OptimizerError> {
    for (name, range) in [("buy_range", &config.buy_range), ("sell_range", &config.sell_range)] {
        if !range.is_well_formed() {
            return Err(OptimizerError::ParameterGeneration(format!(
                "'{}' needs finite bounds, start <= end and a positive step.",
                name
            )));
        }
    }

    Ok(config
        .buy_range
        .values()
        .into_iter()
        .cartesian_product(config.sell_range.values())
        .map(|(buy, sell)| GridCell { buy, sell })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use configuration::GridRange;

    #[test]
    fn default_grid_is_buy_major() {
        let grid = generate_grid(&StrategyConfig::default()).unwrap();
        assert_eq!(grid.len(), 101 * 76);
        assert_eq!(grid[0], GridCell { buy: -0.10, sell: 0.0 });
        assert_eq!(grid[1].buy, -0.10);
        assert!((grid[1].sell - 0.002).abs() < 1e-12);
        assert!((grid[76].buy - -0.098).abs() < 1e-12);
    }

    #[test]
    fn malformed_range_is_an_error() {
        let config = StrategyConfig {
            sell_range: GridRange {
                start: 0.1,
                end: 0.0,
                step: 0.01,
            },
            ..StrategyConfig::default()
        };
        assert!(matches!(
            generate_grid(&config),
            Err(OptimizerError::ParameterGeneration(_))
        ));
    }
}
