use coin_trading_sim::error::TradeError;
use coin_trading_sim::ledger::{Ledger, parse_player_id, parse_quantity};
use coin_trading_sim::market::MarketEngine;
use coin_trading_sim::models::{NewCoin, Side};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

fn market() -> MarketEngine {
    MarketEngine::with_coins(vec![
        NewCoin::new("c", "Coin", "Coin Co.", dec!(5)),
        NewCoin::new("d", "Dime", "Dime Co.", dec!(0.5)),
    ])
    .unwrap()
}

#[test]
fn test_login_is_idempotent() {
    let m = market();
    let mut ledger = Ledger::new();

    let alice = ledger.create_or_get_player("Alice", &m).unwrap();
    let again = ledger.create_or_get_player("Alice", &m).unwrap();
    let bob = ledger.create_or_get_player("Bob", &m).unwrap();

    assert_eq!(alice, again);
    assert_ne!(alice, bob);
    assert_eq!(ledger.player_count(), 2);

    // 前後の空白は無視する
    assert_eq!(ledger.create_or_get_player("  Alice ", &m).unwrap(), alice);
}

#[test]
fn test_login_rejects_blank_name() {
    let m = market();
    let mut ledger = Ledger::new();
    assert_eq!(ledger.create_or_get_player("   ", &m).unwrap_err(), TradeError::InvalidName);
    assert_eq!(ledger.player_count(), 0);
}

#[test]
fn test_new_player_starts_with_cash_and_zero_holdings() {
    let m = market();
    let mut ledger = Ledger::new();
    let id = ledger.create_or_get_player("Alice", &m).unwrap();

    let player = ledger.get_player(&id).unwrap();
    assert_eq!(player.cash, dec!(1000));
    assert_eq!(player.holdings.len(), 2);
    assert_eq!(player.holdings["c"], dec!(0));
    assert_eq!(player.holdings["d"], dec!(0));
}

#[test]
fn test_custom_starting_cash() {
    let m = market();
    let mut ledger = Ledger::with_starting_cash(dec!(250));
    let id = ledger.create_or_get_player("Alice", &m).unwrap();
    assert_eq!(ledger.get_player(&id).unwrap().cash, dec!(250));
}

#[test]
fn test_buy_then_sell_round_trip() {
    let m = market();
    let mut ledger = Ledger::new();
    let id = ledger.create_or_get_player("Alice", &m).unwrap();

    // 価格 5 で 10 枚買う: 1000 - 50 = 950
    let bought = ledger.trade(&id, "c", Side::Buy, dec!(10), &m).unwrap();
    assert_eq!(bought.money, dec!(950));
    assert_eq!(bought.tokens, dec!(10));
    assert_eq!(bought.coin.value, dec!(5));
    assert_eq!(bought.token_value, dec!(50));

    // 同じ価格で 10 枚売ると元に戻る
    let sold = ledger.trade(&id, "c", Side::Sell, dec!(10), &m).unwrap();
    assert_eq!(sold.money, dec!(1000));
    assert_eq!(sold.tokens, dec!(0));
    assert_eq!(sold.token_value, dec!(0));

    let player = ledger.get_player(&id).unwrap();
    assert_eq!(player.cash, dec!(1000));
    assert_eq!(player.holding("c"), dec!(0));
}

#[test]
fn test_fractional_quantities() {
    let m = market();
    let mut ledger = Ledger::new();
    let id = ledger.create_or_get_player("Alice", &m).unwrap();

    let r = ledger.trade(&id, "d", Side::Buy, dec!(2.5), &m).unwrap();
    assert_eq!(r.money, dec!(998.75));
    assert_eq!(r.tokens, dec!(2.5));

    let r = ledger.trade(&id, "d", Side::Sell, dec!(0.5), &m).unwrap();
    assert_eq!(r.money, dec!(999));
    assert_eq!(r.tokens, dec!(2));
}

#[test]
fn test_buy_with_insufficient_funds_changes_nothing() {
    let m = market();
    let mut ledger = Ledger::new();
    let id = ledger.create_or_get_player("Alice", &m).unwrap();

    // 201 * 5 = 1005 > 1000
    let err = ledger.trade(&id, "c", Side::Buy, dec!(201), &m).unwrap_err();
    assert!(matches!(err, TradeError::InsufficientFunds { .. }), "{err:?}");

    let player = ledger.get_player(&id).unwrap();
    assert_eq!(player.cash, dec!(1000));
    assert_eq!(player.holding("c"), dec!(0));

    // ちょうど全額なら買える
    let r = ledger.trade(&id, "c", Side::Buy, dec!(200), &m).unwrap();
    assert_eq!(r.money, dec!(0));
}

#[test]
fn test_sell_more_than_held_changes_nothing() {
    let m = market();
    let mut ledger = Ledger::new();
    let id = ledger.create_or_get_player("Alice", &m).unwrap();
    ledger.trade(&id, "c", Side::Buy, dec!(3), &m).unwrap();

    let err = ledger.trade(&id, "c", Side::Sell, dec!(4), &m).unwrap_err();
    assert!(matches!(err, TradeError::InsufficientHoldings { .. }), "{err:?}");

    let player = ledger.get_player(&id).unwrap();
    assert_eq!(player.cash, dec!(985));
    assert_eq!(player.holding("c"), dec!(3));
}

#[test]
fn test_non_positive_quantity_is_rejected() {
    let m = market();
    let mut ledger = Ledger::new();
    let id = ledger.create_or_get_player("Alice", &m).unwrap();

    for q in [dec!(0), dec!(-1), dec!(-0.01)] {
        for side in [Side::Buy, Side::Sell] {
            let err = ledger.trade(&id, "c", side, q, &m).unwrap_err();
            assert!(matches!(err, TradeError::InvalidQuantity(_)), "{q} {side:?}: {err:?}");
        }
    }

    let player = ledger.get_player(&id).unwrap();
    assert_eq!(player.cash, dec!(1000));
    assert_eq!(player.holding("c"), dec!(0));
}

#[test]
fn test_parse_quantity() {
    assert_eq!(parse_quantity(&json!(10)).unwrap(), dec!(10));
    assert_eq!(parse_quantity(&json!(2.5)).unwrap(), dec!(2.5));
    assert_eq!(parse_quantity(&json!("3")).unwrap(), dec!(3));
    assert_eq!(parse_quantity(&json!(" 0.25 ")).unwrap(), dec!(0.25));
    assert_eq!(parse_quantity(&json!(1e3)).unwrap(), dec!(1000));

    for bad in [
        json!(0),
        json!(-5),
        json!("abc"),
        json!("NaN"),
        json!("Infinity"),
        json!(""),
        json!(null),
        json!(true),
        json!([1]),
    ] {
        let err = parse_quantity(&bad).unwrap_err();
        assert!(matches!(err, TradeError::InvalidQuantity(_)), "{bad}: {err:?}");
    }
}

#[test]
fn test_unknown_ids() {
    let m = market();
    let mut ledger = Ledger::new();
    let id = ledger.create_or_get_player("Alice", &m).unwrap();
    let stranger = Uuid::new_v4();

    assert_eq!(
        ledger.trade(&stranger, "c", Side::Buy, dec!(1), &m).unwrap_err(),
        TradeError::PlayerNotFound(stranger.to_string())
    );
    assert_eq!(
        ledger.trade(&id, "nope", Side::Buy, dec!(1), &m).unwrap_err(),
        TradeError::CoinNotFound("nope".to_string())
    );
    assert!(matches!(
        ledger.get_portfolio(&stranger, &m),
        Err(TradeError::PlayerNotFound(_))
    ));
    assert!(matches!(
        ledger.coin_detail(&id, "nope", &m),
        Err(TradeError::CoinNotFound(_))
    ));

    assert!(matches!(parse_player_id("not-a-uuid"), Err(TradeError::PlayerNotFound(_))));
    assert_eq!(parse_player_id(&id.to_string()).unwrap(), id);
}

#[test]
fn test_coin_listed_after_login_reads_as_zero() {
    let mut m = market();
    let mut ledger = Ledger::new();
    let id = ledger.create_or_get_player("Alice", &m).unwrap();

    m.add_coin(NewCoin::new("late", "Late", "Late Co.", dec!(2))).unwrap();

    // 既存プレイヤーには後から追加されたコインのエントリはない
    assert!(!ledger.get_player(&id).unwrap().holdings.contains_key("late"));
    let detail = ledger.coin_detail(&id, "late", &m).unwrap();
    assert_eq!(detail.tokens, dec!(0));

    let err = ledger.trade(&id, "late", Side::Sell, dec!(1), &m).unwrap_err();
    assert!(matches!(err, TradeError::InsufficientHoldings { .. }));

    let r = ledger.trade(&id, "late", Side::Buy, dec!(4), &m).unwrap();
    assert_eq!(r.tokens, dec!(4));
    assert_eq!(r.money, dec!(992));

    // 新しいプレイヤーは最初からエントリを持つ
    let bob = ledger.create_or_get_player("Bob", &m).unwrap();
    assert_eq!(ledger.get_player(&bob).unwrap().holdings["late"], dec!(0));
}

#[test]
fn test_portfolio_values_holdings_at_current_price() {
    let mut m = market();
    let mut ledger = Ledger::new();
    let id = ledger.create_or_get_player("Alice", &m).unwrap();
    ledger.trade(&id, "c", Side::Buy, dec!(20), &m).unwrap();
    ledger.trade(&id, "d", Side::Buy, dec!(100), &m).unwrap();

    let view = ledger.get_portfolio(&id, &m).unwrap();
    assert_eq!(view.name, "Alice");
    assert_eq!(view.money, dec!(850));
    assert_eq!(view.portfolio["c"].tokens, dec!(20));
    assert_eq!(view.portfolio["c"].token_value, dec!(100));
    assert_eq!(view.portfolio["d"].token_value, dec!(50));
    assert_eq!(view.net_worth, dec!(1000));

    // 価格が動けば純資産も動く
    m.tick_at(&mut StdRng::seed_from_u64(11), 5);
    let c = m.price_of("c").unwrap();
    let d = m.price_of("d").unwrap();
    let view = ledger.get_portfolio(&id, &m).unwrap();
    assert_eq!(view.net_worth, dec!(850) + dec!(20) * c + dec!(100) * d);
}

#[test]
fn test_delisted_coin_is_left_out_of_portfolio() {
    let mut m = market();
    let mut ledger = Ledger::new();
    let id = ledger.create_or_get_player("Alice", &m).unwrap();
    ledger.trade(&id, "c", Side::Buy, dec!(10), &m).unwrap();

    m.remove_coin("c").unwrap();

    let view = ledger.get_portfolio(&id, &m).unwrap();
    assert!(!view.portfolio.contains_key("c"));
    assert_eq!(view.net_worth, dec!(950));
}

#[test]
fn test_relisted_coin_starts_from_zero_holdings() {
    let mut m = market();
    let mut ledger = Ledger::new();
    let id = ledger.create_or_get_player("Alice", &m).unwrap();
    ledger.trade(&id, "c", Side::Buy, dec!(100), &m).unwrap();

    m.remove_coin("c").unwrap();
    ledger.forget_coin("c");
    m.add_coin(NewCoin::new("c", "Coin", "Coin Co.", dec!(500))).unwrap();

    let view = ledger.get_portfolio(&id, &m).unwrap();
    assert_eq!(view.portfolio["c"].tokens, dec!(0));
    assert_eq!(view.net_worth, dec!(500));
    assert_eq!(ledger.get_player(&id).unwrap().holding("c"), dec!(0));

    // 再上場後のコインは売れない
    assert!(matches!(
        ledger.trade(&id, "c", Side::Sell, dec!(1), &m),
        Err(TradeError::InsufficientHoldings { .. })
    ));
}

#[test]
fn test_leaderboard_sorted_by_net_worth() {
    let mut m = market();
    let mut ledger = Ledger::new();
    let alice = ledger.create_or_get_player("Alice", &m).unwrap();
    let bob = ledger.create_or_get_player("Bob", &m).unwrap();
    let carol = ledger.create_or_get_player("Carol", &m).unwrap();

    ledger.trade(&alice, "c", Side::Buy, dec!(100), &m).unwrap();
    ledger.trade(&carol, "d", Side::Buy, dec!(1000), &m).unwrap();

    let mut rng = StdRng::seed_from_u64(2024);
    for t in 1..=20 {
        m.tick_at(&mut rng, t * 5);

        let board = ledger.list_players(&m);
        assert_eq!(board.len(), 3);
        assert!(board.windows(2).all(|w| w[0].net_worth >= w[1].net_worth));

        for entry in &board {
            let expected = ledger.get_portfolio(&entry.id, &m).unwrap().net_worth;
            assert_eq!(entry.net_worth, expected);
        }
    }

    // Bob は何も買っていないので純資産は常に1000
    let board = ledger.list_players(&m);
    let bob_entry = board.iter().find(|e| e.id == bob).unwrap();
    assert_eq!(bob_entry.net_worth, dec!(1000));
}

#[test]
fn test_leaderboard_ties_keep_login_order() {
    let m = market();
    let mut ledger = Ledger::new();
    let names = ["Zed", "Amy", "Max"];
    for name in names {
        ledger.create_or_get_player(name, &m).unwrap();
    }

    let board = ledger.list_players(&m);
    let order: Vec<&str> = board.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(order, names);

    // Amy が値上がりしないまま買っても純資産は同じ（同額のまま）
    let amy = board[1].id;
    ledger.trade(&amy, "c", Side::Buy, dec!(10), &m).unwrap();
    let order: Vec<String> = ledger.list_players(&m).into_iter().map(|e| e.name).collect();
    assert_eq!(order, names);
}
