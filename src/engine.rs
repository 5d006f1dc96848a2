use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

use crate::schema::{AdSpend, SalesRow};

/// Bucket for sales rows that carry no attribution tag.
pub const ORGANIC_CHANNEL: &str = "Orgânico/Outros";

/// Spend entered under this label is treated like untagged spend: it goes
/// into the general pool and is allocated proportionally.
pub const GENERAL_CHANNEL: &str = "Geral/Institucional";

/// Sentinel ROAS for a channel with commission but zero spend. An
/// "infinite return" is reported as this value, not as an error; sorting
/// treats it like any other multiplier.
pub const ROAS_UNBOUNDED: f64 = 999.0;

/// Per-channel rollup of commission against direct plus allocated spend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelKpi {
    pub channel: String,
    pub commission: f64,
    pub orders: u64,
    /// Spend rows tagged with this exact channel.
    pub direct_spend: f64,
    /// This channel's proportional share of the untagged spend pool.
    pub allocated_general_spend: f64,
    pub total_spend: f64,
    pub profit: f64,
    pub roas: f64,
    pub roi_pct: f64,
    pub cpa: f64,
}

/// Per-calendar-day rollup used by the trend table and charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyKpi {
    pub date: NaiveDate,
    pub commission: f64,
    pub orders: u64,
    pub spend: f64,
    pub profit: f64,
    pub roas: f64,
}

/// Flattened aggregate backing the top-level KPI cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub gross_revenue: f64,
    pub commission: f64,
    pub spend: f64,
    pub profit: f64,
    pub roas: f64,
}

struct ChannelAccum {
    label: String,
    commission: f64,
    orders: u64,
    direct_spend: f64,
}

impl ChannelAccum {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            commission: 0.0,
            orders: 0,
            direct_spend: 0.0,
        }
    }
}

fn ratio_or_sentinel(commission: f64, spend: f64) -> f64 {
    if spend > 0.0 {
        commission / spend
    } else if commission > 0.0 {
        ROAS_UNBOUNDED
    } else {
        0.0
    }
}

fn normalized_filter(channel_filter: Option<&str>) -> Option<String> {
    channel_filter
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
}

// Channels keep first-appearance order so that the default sort has a
// stable, reproducible tie-break.
fn slot_for<'a>(
    order: &'a mut Vec<ChannelAccum>,
    index: &mut HashMap<String, usize>,
    label: &str,
) -> &'a mut ChannelAccum {
    let key = label.to_lowercase();
    let i = *index.entry(key).or_insert_with(|| {
        order.push(ChannelAccum::new(label));
        order.len() - 1
    });
    &mut order[i]
}

/// Combines sales rows and ad-spend rows into per-channel metrics.
///
/// Untagged spend (no tag, or tagged with the general label) is pooled and
/// split across channels in proportion to each channel's share of total
/// commission (the rateio policy). A channel that produced no revenue
/// receives none of the pool: unattributed spend is a sunk cost assigned to
/// the channels that earned, never split evenly.
///
/// Both input collections must already be filtered to the reporting window.
/// The optional channel filter is an exact, case-insensitive match; general
/// spend still allocates over whatever channels remain after filtering.
pub fn channel_rollup(
    rows: &[SalesRow],
    spends: &[AdSpend],
    channel_filter: Option<&str>,
) -> Vec<ChannelKpi> {
    let filter = normalized_filter(channel_filter);
    let general_label = GENERAL_CHANNEL.to_lowercase();

    let mut order: Vec<ChannelAccum> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let label = row.channel_tag().unwrap_or(ORGANIC_CHANNEL);
        if let Some(f) = &filter {
            if label.to_lowercase() != *f {
                continue;
            }
        }
        let slot = slot_for(&mut order, &mut index, label);
        slot.commission += row.commission_value();
        slot.orders += 1;
    }

    let mut total_general_spend = 0.0;
    for spend in spends {
        let amount = spend.amount.max(0.0);
        match spend.channel_tag() {
            Some(tag) if tag.to_lowercase() != general_label => {
                if let Some(f) = &filter {
                    if tag.to_lowercase() != *f {
                        continue;
                    }
                }
                slot_for(&mut order, &mut index, tag).direct_spend += amount;
            }
            _ => total_general_spend += amount,
        }
    }

    let total_commission: f64 = order.iter().map(|a| a.commission).sum();
    debug!(
        "channel rollup: {} channels, total commission {:.2}, general spend pool {:.2}",
        order.len(),
        total_commission,
        total_general_spend
    );

    let mut out: Vec<ChannelKpi> = order
        .into_iter()
        .map(|accum| {
            let share = if total_commission > 0.0 {
                accum.commission / total_commission
            } else {
                0.0
            };
            let allocated = total_general_spend * share;
            let total_spend = accum.direct_spend + allocated;
            let profit = accum.commission - total_spend;
            ChannelKpi {
                roas: ratio_or_sentinel(accum.commission, total_spend),
                roi_pct: if total_spend > 0.0 {
                    profit / total_spend * 100.0
                } else {
                    0.0
                },
                cpa: if accum.orders > 0 {
                    total_spend / accum.orders as f64
                } else {
                    0.0
                },
                channel: accum.label,
                commission: accum.commission,
                orders: accum.orders,
                direct_spend: accum.direct_spend,
                allocated_general_spend: allocated,
                total_spend,
                profit,
            }
        })
        .collect();

    // Default presentation order: revenue descending, stable on ties.
    out.sort_by(|a, b| {
        b.commission
            .partial_cmp(&a.commission)
            .unwrap_or(Ordering::Equal)
    });
    out
}

#[derive(Default)]
struct DayAccum {
    commission: f64,
    orders: u64,
    spend: f64,
}

/// Groups both collections by calendar day. Spend is summed per day with no
/// proportional allocation: daily profit is the day's commission minus the
/// day's spend regardless of tags.
pub fn daily_rollup(rows: &[SalesRow], spends: &[AdSpend]) -> Vec<DailyKpi> {
    let mut days: BTreeMap<NaiveDate, DayAccum> = BTreeMap::new();

    for row in rows {
        let day = days.entry(row.date).or_default();
        day.commission += row.commission_value();
        day.orders += 1;
    }
    for spend in spends {
        days.entry(spend.date).or_default().spend += spend.amount.max(0.0);
    }

    days.into_iter()
        .map(|(date, accum)| DailyKpi {
            date,
            commission: accum.commission,
            orders: accum.orders,
            spend: accum.spend,
            profit: accum.commission - accum.spend,
            roas: ratio_or_sentinel(accum.commission, accum.spend),
        })
        .collect()
}

/// Unsegmented aggregate for the KPI cards. With a channel filter active,
/// only spend rows tagged with that exact channel count; the general pool
/// is NOT re-allocated into the filtered view, so this figure can diverge
/// from the channel table's. That divergence matches the product as
/// shipped and is kept on purpose.
pub fn totals(rows: &[SalesRow], spends: &[AdSpend], channel_filter: Option<&str>) -> Totals {
    let filter = normalized_filter(channel_filter);

    let mut gross_revenue = 0.0;
    let mut commission = 0.0;
    for row in rows {
        if let Some(f) = &filter {
            let label = row.channel_tag().unwrap_or(ORGANIC_CHANNEL);
            if label.to_lowercase() != *f {
                continue;
            }
        }
        gross_revenue += row.revenue_value();
        commission += row.commission_value();
    }

    let mut spend = 0.0;
    for item in spends {
        let amount = item.amount.max(0.0);
        match &filter {
            Some(f) => {
                if item
                    .channel_tag()
                    .is_some_and(|tag| tag.to_lowercase() == *f)
                {
                    spend += amount;
                }
            }
            None => spend += amount,
        }
    }

    Totals {
        gross_revenue,
        commission,
        spend,
        profit: commission - spend,
        roas: if spend > 0.0 { commission / spend } else { 0.0 },
    }
}
