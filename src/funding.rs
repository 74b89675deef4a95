// 5.0: funding fees. perpetual positions pay or receive funding at each settlement.
// 5.1 builds the charged window, 5.2 sums the fees over it.
// sign convention: positive = received by the position, negative = paid.

use crate::capabilities::VenueKind;
use crate::types::Timestamp;
use crate::venue::FundingRateEntry;
use chrono::{DateTime, Duration, DurationRound, Utc};
use rust_decimal::Decimal;

// 5.1: first settlement a position opened at `open_date` is charged for.
// the opening hour counts only if the venue's cutoff has not passed yet.
pub fn funding_window_start(kind: VenueKind, open_date: DateTime<Utc>) -> DateTime<Utc> {
    let hour = open_date
        .duration_trunc(Duration::hours(1))
        .unwrap_or(open_date);
    if kind.funding_fee_cutoff(open_date) {
        hour + Duration::hours(1)
    } else {
        hour
    }
}

// amount paid by a long at one settlement. size * price * rate
pub fn calculate_funding_payment(amount: Decimal, mark_price: Decimal, funding_rate: Decimal) -> Decimal {
    amount * mark_price * funding_rate
}

// 5.2: total fees for a position of `amount` over [start, end].
// positive rates make longs pay and shorts receive.
pub fn calculate_funding_fees(
    amount: Decimal,
    is_short: bool,
    history: &[FundingRateEntry],
    start: Timestamp,
    end: Timestamp,
) -> Decimal {
    let paid_by_long: Decimal = history
        .iter()
        .filter(|entry| entry.timestamp >= start && entry.timestamp <= end)
        .map(|entry| calculate_funding_payment(amount.abs(), entry.mark_price, entry.rate))
        .sum();

    if is_short {
        paid_by_long
    } else {
        -paid_by_long
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 9, 1, h, m, s).unwrap()
    }

    fn entry(dt: DateTime<Utc>, rate: Decimal, mark: Decimal) -> FundingRateEntry {
        FundingRateEntry {
            timestamp: Timestamp::from_datetime(dt),
            rate,
            mark_price: mark,
        }
    }

    #[test]
    fn window_start_honours_binance_cutoff() {
        assert_eq!(funding_window_start(VenueKind::Binance, ts(8, 0, 10)), ts(8, 0, 0));
        assert_eq!(funding_window_start(VenueKind::Binance, ts(8, 0, 16)), ts(9, 0, 0));
        assert_eq!(funding_window_start(VenueKind::Binance, ts(8, 30, 0)), ts(9, 0, 0));
        assert_eq!(funding_window_start(VenueKind::Generic, ts(8, 0, 0)), ts(8, 0, 0));
        assert_eq!(funding_window_start(VenueKind::Generic, ts(8, 0, 1)), ts(9, 0, 0));
    }

    #[test]
    fn funding_payment() {
        // 1 * 50000 * 0.001 = 50
        assert_eq!(calculate_funding_payment(dec!(1), dec!(50000), dec!(0.001)), dec!(50));
    }

    #[test]
    fn long_pays_positive_rates() {
        let history = vec![
            entry(ts(0, 0, 0), dec!(0.0001), dec!(40000)),
            entry(ts(8, 0, 0), dec!(0.0002), dec!(41000)),
            entry(ts(16, 0, 0), dec!(-0.0001), dec!(42000)),
        ];
        let start = Timestamp::from_datetime(ts(8, 0, 0));
        let end = Timestamp::from_datetime(ts(23, 0, 0));

        // 2 * 41000 * 0.0002 = 16.4, 2 * 42000 * -0.0001 = -8.4
        let long = calculate_funding_fees(dec!(2), false, &history, start, end);
        assert_eq!(long, dec!(-8));

        let short = calculate_funding_fees(dec!(-2), true, &history, start, end);
        assert_eq!(short, dec!(8));
    }

    #[test]
    fn empty_window_has_no_fees() {
        let history = vec![entry(ts(0, 0, 0), dec!(0.0001), dec!(40000))];
        let start = Timestamp::from_datetime(ts(1, 0, 0));
        let end = Timestamp::from_datetime(ts(7, 0, 0));
        assert_eq!(calculate_funding_fees(dec!(1), false, &history, start, end), Decimal::ZERO);
    }
}
