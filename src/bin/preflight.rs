use musicstream_api::infra::baas::{AuthProvider, BaasAuthClient};
use musicstream_api::infra::payments::{
    MobileMoneyClient, MobileMoneyGateway, PaypalClient, PaypalGateway,
};
use musicstream_api::{AppConfig, PgStore, Store};
use std::time::Duration;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--skip-gateways]\n\
         \n\
         Requires env vars:\n\
           BAAS_URL, BAAS_ANON_KEY\n\
         Optional (checked when set):\n\
           DATABASE_URL\n\
           MOMO_SUBSCRIPTION_KEY, MOMO_API_USER, MOMO_API_KEY\n\
           PAYPAL_CLIENT_ID, PAYPAL_CLIENT_SECRET, PAYPAL_RETURN_URL, PAYPAL_CANCEL_URL\n\
           CDN_CLOUD_NAME, CDN_API_KEY, CDN_API_SECRET\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let skip_gateways = args.iter().any(|a| a == "--skip-gateways");

    // Force-read config (nice error messages if missing)
    let config = AppConfig::from_env()?;

    println!("> Preflight:");
    println!("  BIND_ADDR={}", config.bind_addr);
    println!("  BAAS_URL={}", config.baas.url);
    println!(
        "  PLATFORM_FEE_PERCENT={}",
        config.billing.fees.platform_percent()
    );
    println!(
        "  Subscription prices: monthly={} {} yearly={} {}",
        config.billing.monthly_price.to_decimal_string(),
        config.billing.monthly_price.currency,
        config.billing.yearly_price.to_decimal_string(),
        config.billing.yearly_price.currency
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()?;

    // Database reachability (the schema is applied on connect)
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, 1).await?;
            store.ping().await?;
            println!("  Postgres reachable, schema applied.");
        }
        None => {
            eprintln!("  Warning: DATABASE_URL not set; the server would run on the in-memory store.");
        }
    }

    // BaaS auth endpoint
    BaasAuthClient::new(http.clone(), config.baas.clone())
        .health()
        .await
        .map_err(|e| anyhow::anyhow!("BaaS auth is unreachable: {}", e))?;
    println!("  BaaS auth reachable.");

    match &config.cdn {
        Some(cdn) => println!("  Media CDN: cloud '{}'.", cdn.cloud_name),
        None => eprintln!("  Warning: media CDN not configured; upload signing disabled."),
    }

    if skip_gateways {
        println!("  Skipping payment gateway checks.");
        println!("> Preflight OK.");
        return Ok(());
    }

    // Payment gateways: each check fetches an access token
    match config.mobile_money.clone() {
        Some(c) => {
            let env = c.target_environment.clone();
            MobileMoneyClient::new(http.clone(), c)
                .health()
                .await
                .map_err(|e| anyhow::anyhow!("Mobile money token request failed: {}", e))?;
            println!("  Mobile money credentials accepted ({}).", env);
        }
        None => eprintln!("  Warning: mobile money not configured."),
    }

    match config.paypal.clone() {
        Some(c) => {
            let verified = c.webhook_id.is_some();
            PaypalClient::new(http.clone(), c)
                .health()
                .await
                .map_err(|e| anyhow::anyhow!("PayPal token request failed: {}", e))?;
            println!("  PayPal credentials accepted.");
            if !verified {
                eprintln!("  Warning: PAYPAL_WEBHOOK_ID not set; webhooks will not be verified.");
            }
        }
        None => eprintln!("  Warning: PayPal not configured."),
    }

    if config.mobile_money.is_none() && config.paypal.is_none() {
        return Err(anyhow::anyhow!(
            "No payment gateway is configured; donations and subscriptions cannot be paid"
        ));
    }

    println!("> Preflight OK.");
    Ok(())
}
