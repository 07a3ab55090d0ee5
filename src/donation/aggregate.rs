use serde::{Deserialize, Serialize};

use super::{Donation, DonationType};

/// Share of attributed donations paid out to an intern.
pub const DEFAULT_STIPEND_RATE: f64 = 0.20;

#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct InternAggregate {
    pub total_donations: f64,
    pub stipend_amount: f64,
}

/// Sums the donations and derives the stipend. Missing amounts count as zero.
pub fn aggregate(donations: &[Donation], stipend_rate: f64) -> InternAggregate {
    let total_donations: f64 = donations.iter().map(Donation::amount_or_zero).sum();

    InternAggregate {
        total_donations,
        stipend_amount: total_donations * stipend_rate,
    }
}

/// Progress of `raised` toward `goal` in `[0, 100]`. A goal that is not
/// positive reports 0.
pub fn progress_percentage(raised: f64, goal: f64) -> f64 {
    if !(goal > 0.0) || raised.is_nan() {
        return 0.0;
    }

    (raised / goal * 100.0).max(0.0).min(100.0)
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct DonationSummary {
    pub count: usize,
    pub total: f64,
    pub referral_total: f64,
    pub direct_total: f64,
}

pub fn summarize(donations: &[Donation]) -> DonationSummary {
    donations
        .iter()
        .fold(DonationSummary::default(), |mut summary, donation| {
            let amount = donation.amount_or_zero();
            summary.count += 1;
            summary.total += amount;
            match donation.donation_type() {
                DonationType::Referral => summary.referral_total += amount,
                DonationType::Direct => summary.direct_total += amount,
            }
            summary
        })
}
