use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::engine::{ChannelKpi, DailyKpi, Totals};
use crate::money::format_brl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortColumn {
    Channel,
    Commission,
    Spend,
    Profit,
    Roas,
    Orders,
}

impl SortColumn {
    /// Metric columns open descending (biggest first); the name column
    /// opens ascending.
    pub fn default_direction(self) -> SortDirection {
        match self {
            SortColumn::Channel => SortDirection::Ascending,
            _ => SortDirection::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Active sort of the channel table. Clicking the current column reverses
/// direction; clicking another column selects it at its default direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            column: SortColumn::Commission,
            direction: SortDirection::Descending,
        }
    }
}

impl SortState {
    pub fn toggle(&mut self, column: SortColumn) {
        if self.column == column {
            self.direction = self.direction.flipped();
        } else {
            self.column = column;
            self.direction = column.default_direction();
        }
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Stable sort, so equal keys keep the engine's output order.
pub fn sort_channels(channels: &mut [ChannelKpi], state: SortState) {
    channels.sort_by(|a, b| {
        let ord = match state.column {
            SortColumn::Channel => a.channel.to_lowercase().cmp(&b.channel.to_lowercase()),
            SortColumn::Commission => cmp_f64(a.commission, b.commission),
            SortColumn::Spend => cmp_f64(a.total_spend, b.total_spend),
            SortColumn::Profit => cmp_f64(a.profit, b.profit),
            SortColumn::Roas => cmp_f64(a.roas, b.roas),
            SortColumn::Orders => a.orders.cmp(&b.orders),
        };
        match state.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

/// Everything the dashboard screen needs for one reporting window.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub totals: Totals,
    pub channels: Vec<ChannelKpi>,
    pub daily: Vec<DailyKpi>,
}

impl DashboardReport {
    pub fn sorted_channels(&self, state: SortState) -> Vec<ChannelKpi> {
        let mut channels = self.channels.clone();
        sort_channels(&mut channels, state);
        channels
    }
}

pub fn render_channel_table(channels: &[ChannelKpi]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<24} {:>14} {:>8} {:>14} {:>14} {:>8} {:>10}\n",
        "Canal", "Comissão", "Pedidos", "Investimento", "Lucro", "ROAS", "CPA"
    ));
    for kpi in channels {
        out.push_str(&format!(
            "{:<24} {:>14} {:>8} {:>14} {:>14} {:>8.2} {:>10}\n",
            kpi.channel,
            format_brl(kpi.commission),
            kpi.orders,
            format_brl(kpi.total_spend),
            format_brl(kpi.profit),
            kpi.roas,
            format_brl(kpi.cpa),
        ));
    }
    out
}

pub fn render_daily_table(daily: &[DailyKpi]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<12} {:>14} {:>8} {:>14} {:>14} {:>8}\n",
        "Dia", "Comissão", "Pedidos", "Investimento", "Lucro", "ROAS"
    ));
    for day in daily {
        out.push_str(&format!(
            "{:<12} {:>14} {:>8} {:>14} {:>14} {:>8.2}\n",
            day.date.format("%Y-%m-%d"),
            format_brl(day.commission),
            day.orders,
            format_brl(day.spend),
            format_brl(day.profit),
            day.roas,
        ));
    }
    out
}

pub fn render_totals(totals: &Totals) -> String {
    format!(
        "Faturamento: {}  Comissão: {}  Investimento: {}  Lucro: {}  ROAS: {:.2}\n",
        format_brl(totals.gross_revenue),
        format_brl(totals.commission),
        format_brl(totals.spend),
        format_brl(totals.profit),
        totals.roas,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kpi(channel: &str, commission: f64, spend: f64, orders: u64) -> ChannelKpi {
        ChannelKpi {
            channel: channel.to_string(),
            commission,
            orders,
            direct_spend: spend,
            allocated_general_spend: 0.0,
            total_spend: spend,
            profit: commission - spend,
            roas: if spend > 0.0 { commission / spend } else { 0.0 },
            roi_pct: 0.0,
            cpa: 0.0,
        }
    }

    #[test]
    fn test_toggle_same_column_reverses() {
        let mut state = SortState::default();
        assert_eq!(state.column, SortColumn::Commission);
        assert_eq!(state.direction, SortDirection::Descending);

        state.toggle(SortColumn::Commission);
        assert_eq!(state.direction, SortDirection::Ascending);

        state.toggle(SortColumn::Commission);
        assert_eq!(state.direction, SortDirection::Descending);
    }

    #[test]
    fn test_toggle_new_column_resets_to_default() {
        let mut state = SortState::default();
        state.toggle(SortColumn::Commission); // now ascending
        state.toggle(SortColumn::Profit);
        assert_eq!(state.column, SortColumn::Profit);
        assert_eq!(state.direction, SortDirection::Descending);

        state.toggle(SortColumn::Channel);
        assert_eq!(state.direction, SortDirection::Ascending);
    }

    #[test]
    fn test_sort_by_profit_descending() {
        let mut channels = vec![kpi("A", 100.0, 90.0, 5), kpi("B", 50.0, 10.0, 2)];
        sort_channels(
            &mut channels,
            SortState {
                column: SortColumn::Profit,
                direction: SortDirection::Descending,
            },
        );
        assert_eq!(channels[0].channel, "B");
    }

    #[test]
    fn test_sort_channel_name_case_insensitive() {
        let mut channels = vec![kpi("beta", 1.0, 0.0, 1), kpi("Alpha", 2.0, 0.0, 1)];
        sort_channels(
            &mut channels,
            SortState {
                column: SortColumn::Channel,
                direction: SortDirection::Ascending,
            },
        );
        assert_eq!(channels[0].channel, "Alpha");
    }

    #[test]
    fn test_stable_tie_break() {
        let mut channels = vec![
            kpi("first", 10.0, 0.0, 1),
            kpi("second", 10.0, 0.0, 1),
            kpi("third", 10.0, 0.0, 1),
        ];
        sort_channels(
            &mut channels,
            SortState {
                column: SortColumn::Commission,
                direction: SortDirection::Descending,
            },
        );
        let names: Vec<&str> = channels.iter().map(|c| c.channel.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_render_contains_rows() {
        let table = render_channel_table(&[kpi("fb-ads", 1234.56, 1000.0, 10)]);
        assert!(table.contains("fb-ads"));
        assert!(table.contains("R$ 1.234,56"));
    }
}
