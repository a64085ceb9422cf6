//! Property tests for simulator invariants.
//!
//! Uses proptest to verify:
//! 1. Cash accounting: value == cash + shares * close at every bar
//! 2. One value-history entry per bar, cash never negative
//! 3. Single position: trades alternate BUY, SELL, BUY, ... starting with BUY
//! 4. Crossover never emits two fills of the same side in a row
//! 5. Buy-and-hold on a rising series ends above initial capital with one trade

use chrono::NaiveDate;
use finanz_core::domain::{Bar, Side};
use finanz_core::engine::simulate;
use finanz_core::strategy::{BuyAndHold, Crossover, ExternalSignal, Signal};
use proptest::prelude::*;
use std::sync::Arc;

// ── Generators ───────────────────────────────────────────────────────

fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            date: base + chrono::Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1_000,
        })
        .collect()
}

fn arb_closes(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((1.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0), 1..max_len)
}

fn arb_capital() -> impl Strategy<Value = f64> {
    (1.0..1_000_000.0_f64).prop_map(|c| (c * 100.0).round() / 100.0)
}

fn arb_signals(len: usize) -> impl Strategy<Value = Vec<Signal>> {
    prop::collection::vec(
        prop_oneof![Just(Signal::Buy), Just(Signal::Sell), Just(Signal::Hold)],
        len,
    )
}

fn scripted(signals: Vec<Signal>) -> ExternalSignal {
    ExternalSignal::new(Arc::new(move |history: &[Bar]| signals[history.len() - 1]))
}

fn assert_alternating(sides: &[Side]) -> Result<(), TestCaseError> {
    for (i, side) in sides.iter().enumerate() {
        let expected = if i % 2 == 0 { Side::Buy } else { Side::Sell };
        prop_assert_eq!(*side, expected, "trade {} out of order", i);
    }
    Ok(())
}

// ── 1 & 2. Accounting ────────────────────────────────────────────────

proptest! {
    #[test]
    fn value_history_matches_cash_accounting(
        (closes, signals) in arb_closes(80).prop_flat_map(|c| {
            let n = c.len();
            (Just(c), arb_signals(n))
        }),
        capital in arb_capital(),
    ) {
        let bars = bars_from_closes(&closes);
        let sim = simulate(&bars, &scripted(signals), capital).unwrap();
        let portfolio = &sim.portfolio;

        prop_assert_eq!(portfolio.value_history.len(), bars.len());
        prop_assert!(portfolio.cash >= 0.0);

        // Replay the trade log and check every marked value.
        let mut cash = capital;
        let mut shares = 0u64;
        let mut trades = portfolio.trade_log.iter().peekable();
        for (bar, point) in bars.iter().zip(&portfolio.value_history) {
            prop_assert_eq!(point.date, bar.date);
            while let Some(trade) = trades.next_if(|t| t.date == bar.date) {
                prop_assert!(trade.shares > 0);
                match trade.side {
                    Side::Buy => {
                        cash -= trade.shares as f64 * trade.price;
                        shares = trade.shares;
                    }
                    Side::Sell => {
                        cash += trade.shares as f64 * trade.price;
                        shares = 0;
                    }
                }
            }
            let expected = cash + shares as f64 * bar.close;
            prop_assert!((point.value - expected).abs() <= 1e-6 * expected.abs().max(1.0));
        }
    }

    // ── 3. Single position ───────────────────────────────────────────

    #[test]
    fn trades_alternate_for_any_signal_stream(
        (closes, signals) in arb_closes(80).prop_flat_map(|c| {
            let n = c.len();
            (Just(c), arb_signals(n))
        }),
        capital in arb_capital(),
    ) {
        let bars = bars_from_closes(&closes);
        let sim = simulate(&bars, &scripted(signals), capital).unwrap();
        let sides: Vec<Side> = sim.portfolio.trade_log.iter().map(|t| t.side).collect();
        assert_alternating(&sides)?;
        prop_assert!(sim.ignored_signals <= sim.signal_count);
    }

    // ── 4. Crossover ─────────────────────────────────────────────────

    #[test]
    fn crossover_never_double_buys(
        closes in arb_closes(200),
        short in 1usize..10,
        extra in 1usize..30,
    ) {
        let bars = bars_from_closes(&closes);
        let strategy = Crossover::new(short, short + extra).unwrap();
        let sim = simulate(&bars, &strategy, 100_000.0).unwrap();
        let sides: Vec<Side> = sim.portfolio.trade_log.iter().map(|t| t.side).collect();
        assert_alternating(&sides)?;

        // Nothing trades before the long window has filled.
        if let Some(first) = sim.portfolio.trade_log.first() {
            let idx = bars.iter().position(|b| b.date == first.date).unwrap();
            prop_assert!(idx >= short + extra);
        }
    }

    #[test]
    fn never_buying_keeps_value_flat(closes in arb_closes(60), capital in arb_capital()) {
        let bars = bars_from_closes(&closes);
        let hold = ExternalSignal::new(Arc::new(|_: &[Bar]| Signal::Hold));
        let sim = simulate(&bars, &hold, capital).unwrap();
        prop_assert!(sim.portfolio.trade_log.is_empty());
        prop_assert!(sim.portfolio.value_history.iter().all(|p| p.value == capital));
    }

    // ── 5. Buy-and-hold ──────────────────────────────────────────────

    #[test]
    fn buy_and_hold_profits_on_rising_series(
        start in 10.0..100.0_f64,
        steps in prop::collection::vec(0.5..5.0_f64, 1..50),
    ) {
        let mut closes = vec![start];
        for step in steps {
            let next = closes[closes.len() - 1] + step;
            closes.push(next);
        }
        let bars = bars_from_closes(&closes);
        let sim = simulate(&bars, &BuyAndHold, 10_000.0).unwrap();
        prop_assert_eq!(sim.portfolio.trade_log.len(), 1);
        let last = sim.portfolio.value_history.last().unwrap().value;
        prop_assert!(last > 10_000.0);
    }
}
