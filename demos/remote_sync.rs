use marketdash::remote::{ApiClient, ApiConfig, RowsQuery};
use marketdash::store::{cache_key, EntityStore, ADSPENDS_ENTITY, DATASET_ENTITY};
use marketdash::{build_dashboard, report, AdSpend, ReportQuery, SalesRow};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = ApiConfig::from_env()?;
    let user_id = config.user_id.clone();
    let client = ApiClient::new(config);

    let rows_store: EntityStore<SalesRow> = EntityStore::with_persistence(".marketdash-cache");
    let spends_store: EntityStore<AdSpend> = EntityStore::with_persistence(".marketdash-cache");

    let rows_client = client.clone();
    let rows = rows_store
        .get_or_fetch(&cache_key(DATASET_ENTITY, &user_id), move || async move {
            rows_client
                .fetch_sales_rows(&RowsQuery {
                    include_raw: true,
                    ..Default::default()
                })
                .await
        })
        .await?;

    let spends_client = client.clone();
    let spends = spends_store
        .get_or_fetch(&cache_key(ADSPENDS_ENTITY, &user_id), move || async move {
            spends_client.list_ad_spends().await
        })
        .await?;

    let dashboard = build_dashboard(&rows.rows, &spends.rows, &ReportQuery::default());

    println!("{}", report::render_totals(&dashboard.totals));
    println!("{}", report::render_channel_table(&dashboard.channels));
    println!("{}", report::render_daily_table(&dashboard.daily));

    Ok(())
}
