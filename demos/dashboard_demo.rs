use chrono::NaiveDate;
use marketdash::{
    build_dashboard, report, AdSpend, ReportQuery, SalesRow, SortColumn, SortState,
};
use std::collections::BTreeMap;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn row(id: &str, date: NaiveDate, sub_id: Option<&str>, commission: f64) -> SalesRow {
    SalesRow {
        id: id.to_string(),
        date,
        time: None,
        product: "Curso de Marketing".to_string(),
        platform: Some("hotmart".to_string()),
        sub_id: sub_id.map(str::to_string),
        gross_revenue: commission * 2.5,
        platform_fee: commission * 0.1,
        commission,
        profit: 0.0,
        raw: BTreeMap::new(),
    }
}

fn spend(id: &str, date: NaiveDate, sub_id: Option<&str>, amount: f64) -> AdSpend {
    AdSpend {
        id: id.to_string(),
        date,
        amount,
        sub_id: sub_id.map(str::to_string),
    }
}

fn main() {
    let rows = vec![
        row("1", d(2024, 3, 1), Some("fb-ads"), 120.0),
        row("2", d(2024, 3, 2), Some("fb-ads"), 95.0),
        row("3", d(2024, 3, 2), Some("google"), 310.0),
        row("4", d(2024, 3, 3), Some("google"), 140.0),
        row("5", d(2024, 3, 3), None, 60.0),
        row("6", d(2024, 3, 5), Some("influencer-x"), 220.0),
    ];
    let spends = vec![
        spend("s1", d(2024, 3, 1), Some("fb-ads"), 80.0),
        spend("s2", d(2024, 3, 2), Some("google"), 150.0),
        spend("s3", d(2024, 3, 3), None, 200.0),
        spend("s4", d(2024, 3, 5), Some("influencer-x"), 90.0),
    ];

    let query = ReportQuery {
        from: Some(d(2024, 3, 1)),
        to: Some(d(2024, 3, 31)),
        channel: None,
    };
    let dashboard = build_dashboard(&rows, &spends, &query);

    println!("{}", report::render_totals(&dashboard.totals));
    println!("Por canal (comissão desc):");
    println!("{}", report::render_channel_table(&dashboard.channels));

    let mut sort = SortState::default();
    sort.toggle(SortColumn::Roas);
    println!("Por canal (ROAS desc):");
    println!(
        "{}",
        report::render_channel_table(&dashboard.sorted_channels(sort))
    );

    println!("Por dia:");
    println!("{}", report::render_daily_table(&dashboard.daily));
}
