use std::env;
use std::error;

use reqwest::Url;

const DEFAULT_URL: &str = "http://127.0.0.1:25566/health";

fn main() -> Result<(), Box<dyn error::Error>> {
    let url = env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());
    let url = Url::parse(&url)?;

    let response = reqwest::blocking::get(url)?;
    if !response.status().is_success() {
        return Err(format!("Health check failed with status {}", response.status()).into());
    }

    Ok(())
}
