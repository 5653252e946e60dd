use std::time::Duration;

use geoip2::webservice::{Client, ClientOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let account_id: u32 = std::env::var("MAXMIND_ACCOUNT_ID")?.parse()?;
    let license_key = std::env::var("MAXMIND_LICENSE_KEY")?;
    let ip = std::env::args().nth(1).unwrap_or_else(|| "me".to_owned());

    let options = ClientOptions::default()
        .with_timeout(Duration::from_secs(10))
        .with_connect_timeout(Duration::from_secs(3));
    let client = Client::new(account_id, license_key, options)?;

    let city = client.city(&ip)?;
    println!(
        "{} ({:?}), network {:?}, {:?} queries remaining",
        city.city.name.as_deref().unwrap_or("unknown city"),
        city.country.iso_code,
        city.traits.network,
        city.maxmind.queries_remaining,
    );
    Ok(())
}
