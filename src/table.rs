use comfy_table::{Cell, Table, presets::UTF8_FULL};
use database::LabeledStock;

/// Renders labeled stocks and their optimized parameters.
pub fn labeled_stocks(stocks: &[LabeledStock]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Code", "Name", "Label", "R²", "Ann. %", "Turnover", "Buy %", "Sell %", "Return %",
        "Bench %", "Win %", "Trades",
    ]);

    for stock in stocks {
        let verdict = &stock.verdict;
        let mut row = vec![
            Cell::new(&stock.listing.code),
            Cell::new(&stock.listing.name),
            Cell::new(verdict.label),
            Cell::new(format!("{:.4}", verdict.r_squared)),
            Cell::new(format!("{:.2}", verdict.annualized_return_pct)),
            Cell::new(format!("{:.0}", verdict.avg_turnover)),
        ];
        match &stock.strategy {
            Some(p) => row.extend([
                Cell::new(p.buy_bias_threshold_pct),
                Cell::new(p.sell_bias_threshold_pct),
                Cell::new(p.total_return_pct),
                Cell::new(p.benchmark_return_pct),
                Cell::new(p.win_rate_pct),
                Cell::new(p.trade_count),
            ]),
            None => row.extend((0..6).map(|_| Cell::new("-"))),
        }
        table.add_row(row);
    }
    table
}
