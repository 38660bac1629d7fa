use rust_decimal_macros::dec;

use crate::models::NewCoin;

/// 起動時に上場しているコイン
///
/// 1未満の価格のものは最初のティックで下限の1に張り付く。
pub fn default_coins() -> Vec<NewCoin> {
    vec![
        NewCoin::new("papacoin", "PapaCoin", "PapaCoin corp.", dec!(10)).with_rates(dec!(10), dec!(20)),
        NewCoin::new("moonrock", "MoonRock Token", "Lunar Mining Ltd.", dec!(42.5)).with_rates(dec!(4), dec!(35)),
        NewCoin::new("byteburger", "ByteBurger Coin", "ByteBurger Inc.", dec!(3.2)).with_rates(dec!(-2), dec!(12)),
        NewCoin::new("dogewash", "DogeWash", "Suds & Paws Co.", dec!(0.0001)).with_rates(dec!(150), dec!(90)),
        NewCoin::new("quantumkale", "QuantumKale Coin", "Leafy Labs", dec!(0.25)).with_rates(dec!(8), dec!(15)),
        NewCoin::new("steamvault", "SteamVault", "Vault Holdings", dec!(250)).with_rates(dec!(1), dec!(5)),
    ]
}
