use geoip2::{Locales, Reader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .ok_or("First argument must be the path to the IP database")?;
    let ip = args
        .next()
        .ok_or("Second argument must be the IP address, like 128.101.101.101")?;
    let locales = Locales::new(args).unwrap_or_default();

    let reader = Reader::open_readfile(path, locales)?;
    let database_type = reader.database_type().to_owned();
    if database_type.contains("City") {
        println!("{}", serde_json::to_string_pretty(&reader.city(&ip)?)?);
    } else if database_type.contains("Country") {
        println!("{}", serde_json::to_string_pretty(&reader.country(&ip)?)?);
    } else if database_type.contains("Enterprise") {
        println!("{}", serde_json::to_string_pretty(&reader.enterprise(&ip)?)?);
    } else if database_type.contains("ASN") {
        println!("{}", serde_json::to_string_pretty(&reader.asn(&ip)?)?);
    } else if database_type.contains("ISP") {
        println!("{}", serde_json::to_string_pretty(&reader.isp(&ip)?)?);
    } else {
        return Err(format!("unsupported database type {database_type}").into());
    }
    Ok(())
}
