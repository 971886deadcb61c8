//! End-to-end: a bootstrapped curve discounts option prices that are then
//! inverted back to volatilities.

use approx::assert_abs_diff_eq;
use qlcalib::core::LazyObject;
use qlcalib::math::{Linear, LogLinear};
use qlcalib::pricingengines::{implied_volatility, OptionType, PlainVanillaPayoff};
use qlcalib::quotes::SimpleQuote;
use qlcalib::termstructures::{
    Actual360, Actual365Fixed, CalibratingInstrument, Date, DepositRateHelper, Discount,
    FraRateHelper, PiecewiseCurve, TermStructure, YieldTermStructure, ZeroYield,
};
use std::rc::Rc;

fn date(y: i32, m: u32, d: u32) -> Date {
    Date::from_ymd_opt(y, m, d).unwrap()
}

fn money_market(
    today: Date,
    quotes: &[Rc<SimpleQuote>; 3],
) -> Vec<Rc<dyn CalibratingInstrument>> {
    let deposit = |quote: &Rc<SimpleQuote>, maturity: Date| {
        DepositRateHelper::new(quote.clone(), today, maturity, Actual360).unwrap()
    };
    vec![
        Rc::new(deposit(&quotes[0], date(2025, 4, 2))),
        Rc::new(deposit(&quotes[1], date(2025, 7, 2))),
        Rc::new(
            FraRateHelper::new(quotes[2].clone(), date(2025, 7, 2), date(2026, 1, 2), Actual360)
                .unwrap(),
        ),
    ]
}

#[test]
fn test_discounted_option_round_trip() {
    let today = date(2025, 1, 2);
    let quotes = [
        Rc::new(SimpleQuote::new(0.031)),
        Rc::new(SimpleQuote::new(0.032)),
        Rc::new(SimpleQuote::new(0.034)),
    ];
    let instruments = money_market(today, &quotes);
    let curve = PiecewiseCurve::new(today, instruments, Actual365Fixed, Discount, LogLinear);

    let expiry = date(2025, 10, 2);
    let t = curve.time_from_reference(expiry);
    let discount = curve.discount(t).unwrap();
    let payoff = PlainVanillaPayoff::new(OptionType::Put, 95.0);
    let std_dev = 0.22 * t.sqrt();

    let price = payoff.black_price(100.0, std_dev, discount, 0.0).unwrap();
    let vol = implied_volatility(
        OptionType::Put,
        95.0,
        100.0,
        price,
        discount,
        t,
        Some(0.3),
        1e-12,
        0.0,
    )
    .unwrap();
    assert_abs_diff_eq!(vol, 0.22, epsilon = 1e-8);

    // a higher short rate lowers the discount; the same premium then
    // implies a higher volatility
    quotes[0].set_value(0.05);
    quotes[1].set_value(0.05);
    quotes[2].set_value(0.05);
    let lower = curve.discount(t).unwrap();
    assert!(lower < discount);
    let bumped = implied_volatility(OptionType::Put, 95.0, 100.0, price, lower, t, None, 1e-12, 0.0)
        .unwrap();
    assert!(bumped > vol);
    assert_eq!(curve.calculations(), 2);
}

#[test]
fn test_curve_kinds_agree_on_flat_market() {
    let today = date(2025, 1, 2);
    let quotes = [
        Rc::new(SimpleQuote::new(0.03)),
        Rc::new(SimpleQuote::new(0.03)),
        Rc::new(SimpleQuote::new(0.03)),
    ];
    let discount_curve = PiecewiseCurve::new(
        today,
        money_market(today, &quotes),
        Actual365Fixed,
        Discount,
        LogLinear,
    );
    let zero_curve = PiecewiseCurve::new(
        today,
        money_market(today, &quotes),
        Actual365Fixed,
        ZeroYield,
        Linear,
    );

    // at the nodes both fits reprice the same instruments
    for node in discount_curve.dates().unwrap() {
        let t = discount_curve.time_from_reference(node);
        assert_abs_diff_eq!(
            discount_curve.discount(t).unwrap(),
            zero_curve.discount(t).unwrap(),
            epsilon = 1e-10
        );
    }
    assert!(!discount_curve.is_frozen());
}
