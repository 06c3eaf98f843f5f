use proptest::prelude::*;
use rust_decimal_macros::dec;
use yield_curve::{decimal::approx_eq, Context, Decimal, Pool, SimConfig, User, Vault};

fn setup() -> (Pool, Vault) {
    let cfg = SimConfig::default();
    (
        Pool::new(cfg.curve.clone()).unwrap(),
        Vault::new(&cfg.vault).unwrap(),
    )
}

fn tolerance() -> Decimal {
    dec!(0.000000000000000001)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Vault balance never shrinks under compounding and tracks the
    /// day-by-day index exactly.
    #[test]
    fn prop_vault_growth_is_monotonic(
        principal in 1u64..10_000_000u64,
        steps in proptest::collection::vec(0u32..120u32, 1..6),
    ) {
        let cfg = SimConfig::default();
        let mut vault = Vault::new(&cfg.vault).unwrap();
        vault.add(Decimal::from(principal)).unwrap();

        let growth = cfg.vault.daily_growth().unwrap();
        let mut index = Decimal::ONE;
        let mut last = vault.balance_of();
        let mut days_total = 0u64;
        for days in steps {
            vault.compound(days).unwrap();
            for _ in 0..days {
                index *= growth;
            }
            days_total += u64::from(days);

            let balance = vault.balance_of();
            prop_assert!(balance >= last);
            last = balance;
        }
        prop_assert_eq!(vault.compounding_index(), index);
        prop_assert_eq!(vault.compounds(), days_total);
        prop_assert!(approx_eq(vault.balance_of(), Decimal::from(principal) * index, tolerance()));
    }

    /// Sells never pay more than the vault holds, nor more than the seller's
    /// pro-rata share of it; minted stays within the cap throughout.
    #[test]
    fn prop_sells_respect_fair_share(
        buys in proptest::collection::vec(1u64..50_000u64, 1..5),
        sell_pct in proptest::collection::vec(1u32..=100u32, 5),
        days in 0u32..400u32,
    ) {
        let (mut pool, mut vault) = setup();
        let mut users: Vec<User> = buys
            .iter()
            .enumerate()
            .map(|(i, usd)| User::new(format!("user{i}"), Decimal::from(*usd)))
            .collect();

        for (user, usd) in users.iter_mut().zip(&buys) {
            yield_curve::buy(Context::new(&mut pool, &mut vault, user), Decimal::from(*usd)).unwrap();
            prop_assert!(pool.minted() <= pool.cap());
        }
        vault.compound(days).unwrap();

        for (user, pct) in users.iter_mut().zip(&sell_pct) {
            let amount = user.balance_token * Decimal::from(*pct) / Decimal::ONE_HUNDRED;
            let vault_before = vault.balance_of();

            let receipt = yield_curve::sell(Context::new(&mut pool, &mut vault, user), amount).unwrap();

            prop_assert!(receipt.usd_out > Decimal::ZERO);
            prop_assert!(receipt.usd_out <= vault_before);
            // pro-rata share against the supply left after the burn
            if pool.minted() > Decimal::ZERO {
                prop_assert!(receipt.usd_out <= amount / pool.minted() * vault_before);
            }
            prop_assert!(vault.balance_of() >= Decimal::ZERO);
            prop_assert!(pool.minted() <= pool.cap());
        }
    }

    /// Solving a trade keeps `x * y` on the invariant.
    #[test]
    fn prop_trade_preserves_constant_product(
        seed in 1u64..100_000u64,
        amount in 1u64..100_000u64,
        selling in any::<bool>(),
    ) {
        let (mut pool, mut vault) = setup();
        let mut seeder = User::new("seeder", Decimal::from(seed));
        let bought = yield_curve::buy(Context::new(&mut pool, &mut vault, &mut seeder), Decimal::from(seed))
            .unwrap();

        let quote = if selling {
            // never sell more than is in circulation
            let tokens = Decimal::from(amount).min(bought.tokens_out);
            yield_curve::quote_sell(&pool, &vault, tokens)
        } else {
            yield_curve::quote_buy(&pool, &vault, Decimal::from(amount))
        }
        .unwrap();

        prop_assert!(approx_eq(quote.new_token_reserve * quote.new_usdc_reserve, quote.k, tolerance()));
        prop_assert!(quote.amount_out <= quote.curve_out);
    }

    /// Opening and closing liquidity with no elapsed time returns principal.
    #[test]
    fn prop_liquidity_round_trip(
        prior_buy in 0u64..20_000u64,
        usd in 1u64..1_000_000u64,
    ) {
        let (mut pool, mut vault) = setup();
        if prior_buy > 0 {
            let mut buyer = User::new("buyer", Decimal::from(prior_buy));
            yield_curve::buy(Context::new(&mut pool, &mut vault, &mut buyer), Decimal::from(prior_buy))
                .unwrap();
        }

        let mut lp = User::new("lp", Decimal::from(usd));
        yield_curve::add_liquidity(Context::new(&mut pool, &mut vault, &mut lp), Decimal::ZERO, Decimal::from(usd))
            .unwrap();
        let exit = yield_curve::remove_liquidity(Context::new(&mut pool, &mut vault, &mut lp)).unwrap();

        prop_assert_eq!(exit.compound_delta, Decimal::ONE);
        prop_assert!(approx_eq(lp.balance_usd, Decimal::from(usd), tolerance()));
        prop_assert!(lp.balance_usd <= Decimal::from(usd));
        prop_assert!(pool.position("lp").is_none());
    }
}
