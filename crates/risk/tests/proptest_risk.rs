use proptest::prelude::*;
use common::{OpenPosition, PositionSide};
use risk::{RiskManager, RiskParameters};

fn position(side: PositionSide, entry_price: f64, stop_loss: f64, initial: Option<f64>) -> OpenPosition {
    OpenPosition {
        id: "p1".into(),
        symbol: "TESTUSD".into(),
        side,
        entry_price,
        stop_loss,
        take_profit: 0.0,
        initial_stop_loss: initial,
        volume: 0.1,
        opened_at: chrono::Utc::now(),
    }
}

proptest! {
    /// A proposed long stop is always strictly above the current stop.
    #[test]
    fn long_ratchet_only_tightens(
        entry in 0.5f64..2.0,
        risk_dist in 0.0001f64..0.05,
        stop_offset in -0.05f64..0.05,
        price in 0.4f64..2.2,
        track_initial in any::<bool>(),
    ) {
        let manager = RiskManager::new(RiskParameters::default(), 2).unwrap();
        let initial = entry - risk_dist;
        let current = initial + stop_offset;
        let pos = position(PositionSide::Long, entry, current, track_initial.then_some(initial));

        if let Some(new_stop) = manager.trailing_update(&pos, price) {
            prop_assert!(new_stop > current);
            prop_assert!(new_stop > entry);
            prop_assert!(new_stop < price);
        }
    }

    /// A proposed short stop is always strictly below the current stop.
    #[test]
    fn short_ratchet_only_tightens(
        entry in 0.5f64..2.0,
        risk_dist in 0.0001f64..0.05,
        stop_offset in -0.05f64..0.05,
        price in 0.4f64..2.2,
        track_initial in any::<bool>(),
    ) {
        let manager = RiskManager::new(RiskParameters::default(), 2).unwrap();
        let initial = entry + risk_dist;
        let current = initial + stop_offset;
        let pos = position(PositionSide::Short, entry, current, track_initial.then_some(initial));

        if let Some(new_stop) = manager.trailing_update(&pos, price) {
            prop_assert!(new_stop < current);
            prop_assert!(new_stop < entry);
            prop_assert!(new_stop > price);
        }
    }

    /// Applying a proposed stop makes the next evaluation at the same price a no-op.
    #[test]
    fn applying_an_update_is_idempotent(
        entry in 0.5f64..2.0,
        risk_dist in 0.0001f64..0.05,
        move_in_risks in 1.6f64..10.0,
    ) {
        let manager = RiskManager::new(RiskParameters::default(), 2).unwrap();
        let initial = entry - risk_dist;
        let price = entry + risk_dist * move_in_risks;
        let mut pos = position(PositionSide::Long, entry, initial, Some(initial));

        let new_stop = manager.trailing_update(&pos, price);
        prop_assert!(new_stop.is_some());
        pos.stop_loss = new_stop.unwrap();
        prop_assert_eq!(manager.trailing_update(&pos, price), None);
    }

    /// Entry levels always bracket the entry price on the correct sides.
    #[test]
    fn entry_levels_bracket_price(price in 0.5f64..200.0, atr in 0.00001f64..5.0) {
        let manager = RiskManager::new(RiskParameters::default(), 2).unwrap();

        let long = manager.entry_levels("TESTUSD", PositionSide::Long, price, atr).unwrap();
        prop_assert!(long.stop_loss < price && price < long.take_profit);

        let short = manager.entry_levels("TESTUSD", PositionSide::Short, price, atr).unwrap();
        prop_assert!(short.take_profit < price && price < short.stop_loss);
    }
}
