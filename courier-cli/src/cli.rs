use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use courier_core::{Client, ClientConfig, Config, Method, RequestDescriptor, WeatherCredentials};
use serde_json::{Map, Value};

use crate::weather;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "courier", version, about = "Cancellable HTTP requests from the command line")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure base address, timeout and weather API credentials.
    Configure,

    /// Send requests concurrently, optionally cancelling some of them.
    Fetch {
        /// Request URLs, absolute or relative to the configured base address.
        #[arg(required = true)]
        urls: Vec<String>,

        /// HTTP method used for every request.
        #[arg(long, short = 'X', default_value = "GET")]
        method: String,

        /// Payload entries as key=value; sent as query for GET, JSON body otherwise.
        #[arg(long = "data", short = 'd', value_parser = parse_key_value)]
        data: Vec<(String, String)>,

        /// URLs to cancel once the delay elapses.
        #[arg(long)]
        cancel: Vec<String>,

        /// Cancel everything in flight once the delay elapses.
        #[arg(long, conflicts_with = "cancel")]
        cancel_all: bool,

        /// Delay before cancelling, in milliseconds.
        #[arg(long, default_value_t = 0)]
        after_ms: u64,
    },

    /// Show the 3-hourly forecast for a coordinate.
    Weather {
        #[arg(long, allow_hyphen_values = true)]
        lat: String,

        #[arg(long, allow_hyphen_values = true)]
        lon: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Fetch {
                urls,
                method,
                data,
                cancel,
                cancel_all,
                after_ms,
            } => {
                let method = Method::try_from(method.as_str())?;
                let plan = CancelPlan {
                    urls: cancel,
                    all: cancel_all,
                    after: Duration::from_millis(after_ms),
                };
                fetch(urls, method, payload(data), plan).await
            }
            Command::Weather { lat, lon } => show_weather(&lat, &lon).await,
        }
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn payload(entries: Vec<(String, String)>) -> Option<Value> {
    if entries.is_empty() {
        return None;
    }
    let map: Map<String, Value> = entries
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    Some(Value::Object(map))
}

fn load_client() -> anyhow::Result<(Config, Arc<Client>)> {
    let mut config = Config::load()?;
    config.client.apply_env_overrides()?;
    let client = Client::new(config.client.clone())?;
    Ok((config, Arc::new(client)))
}

/// Ctrl-C cancels every in-flight request; pending calls then settle as cancelled.
fn cancel_on_ctrl_c(client: &Arc<Client>) {
    let client = Arc::clone(client);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling {} request(s)", client.in_flight_len());
            client.cancel_all();
        }
    });
}

#[derive(Debug)]
struct CancelPlan {
    urls: Vec<String>,
    all: bool,
    after: Duration,
}

impl CancelPlan {
    fn is_empty(&self) -> bool {
        !self.all && self.urls.is_empty()
    }

    /// Runs once every tracked request has registered, then waits `after`.
    fn schedule(self, client: &Arc<Client>, tracked: usize, settled: &Arc<AtomicUsize>) {
        if self.is_empty() {
            return;
        }
        let client = Arc::clone(client);
        let settled = Arc::clone(settled);
        tokio::spawn(async move {
            wait_until_tracked(&client, tracked, &settled).await;
            tokio::time::sleep(self.after).await;
            if self.all {
                client.cancel_all();
            } else {
                client.cancel_many(&self.urls);
            }
        });
    }
}

/// A request registers before it settles, and `settled` is only bumped after
/// its entry is gone, so the sum reaches `expected` once all have registered.
async fn wait_until_tracked(client: &Client, expected: usize, settled: &AtomicUsize) {
    while client.in_flight_len() + settled.load(Ordering::Acquire) < expected {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

async fn fetch(
    urls: Vec<String>,
    method: Method,
    data: Option<Value>,
    plan: CancelPlan,
) -> anyhow::Result<()> {
    let (_, client) = load_client()?;
    cancel_on_ctrl_c(&client);

    let settled = Arc::new(AtomicUsize::new(0));
    let mut tracked = 0;

    let pending: Vec<_> = urls
        .into_iter()
        .map(|url| {
            let mut descriptor = RequestDescriptor::new(method).url(url.clone());
            descriptor.data = data.clone();
            let is_tracked = descriptor.tracked_url().is_some();
            if is_tracked {
                tracked += 1;
            }
            let client = Arc::clone(&client);
            let settled = Arc::clone(&settled);
            let handle = tokio::spawn(async move {
                let result = client.dispatch(descriptor).await;
                if is_tracked {
                    settled.fetch_add(1, Ordering::Release);
                }
                result
            });
            (url, handle)
        })
        .collect();

    plan.schedule(&client, tracked, &settled);

    let mut failures = 0;
    for (url, handle) in pending {
        match handle.await.context("request task panicked")? {
            Ok(payload) => {
                println!("{url}:");
                println!("{}", serde_json::to_string_pretty(&payload)?);
            }
            Err(err) if err.is_cancelled() => println!("{url}: cancelled"),
            Err(err) => {
                failures += 1;
                println!("{url}: {err}");
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!("{failures} request(s) failed"));
    }
    Ok(())
}

async fn show_weather(lat: &str, lon: &str) -> anyhow::Result<()> {
    let (config, client) = load_client()?;
    let creds = config.weather_credentials()?;
    cancel_on_ctrl_c(&client);

    match weather::get_weather(&client, creds, lat, lon).await {
        Ok(forecast) => {
            weather::print_forecast(&forecast);
            Ok(())
        }
        Err(err) if err.is_cancelled() => {
            println!("cancelled");
            Ok(())
        }
        Err(err) => Err(err).context("Failed to fetch weather forecast"),
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;
    let current = config.client.clone();

    let base_url = inquire::Text::new("Base URL:")
        .with_default(&current.base_url)
        .with_help_message("prepended to relative request URLs; leave empty for none")
        .prompt()?;

    let timeout_ms = inquire::CustomType::<u64>::new("Timeout (milliseconds):")
        .with_default(current.timeout_ms)
        .with_error_message("Please enter a whole number of milliseconds")
        .prompt()?;

    config.client = ClientConfig {
        base_url,
        timeout_ms,
        headers: current.headers,
    };
    config.client.validate()?;

    let set_weather = inquire::Confirm::new("Configure weather API credentials?")
        .with_default(config.weather.is_none())
        .prompt()?;

    if set_weather {
        let default_host = config
            .weather
            .as_ref()
            .map(|w| w.api_host.clone())
            .unwrap_or_else(|| "weatherbit-v1-mashape.p.rapidapi.com".to_string());

        let api_host = inquire::Text::new("RapidAPI host:")
            .with_default(&default_host)
            .prompt()?;
        let api_key = inquire::Password::new("RapidAPI key:")
            .without_confirmation()
            .prompt()?;

        config.weather = Some(WeatherCredentials { api_key, api_host });
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_value_parsing() {
        assert_eq!(
            parse_key_value("lat=35.5").unwrap(),
            ("lat".to_string(), "35.5".to_string())
        );
        assert_eq!(
            parse_key_value("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn payload_builds_object() {
        assert_eq!(payload(Vec::new()), None);
        assert_eq!(
            payload(vec![("lat".into(), "1".into()), ("lon".into(), "2".into())]),
            Some(json!({ "lat": "1", "lon": "2" }))
        );
    }

    #[test]
    fn fetch_arguments_parse() {
        let cli = Cli::try_parse_from([
            "courier", "fetch", "/a", "/b", "-d", "lat=1", "--cancel", "/a", "--after-ms", "50",
        ])
        .unwrap();

        let Command::Fetch {
            urls,
            data,
            cancel,
            cancel_all,
            after_ms,
            ..
        } = cli.command
        else {
            panic!("expected fetch");
        };
        assert_eq!(urls, vec!["/a", "/b"]);
        assert_eq!(data, vec![("lat".to_string(), "1".to_string())]);
        assert_eq!(cancel, vec!["/a"]);
        assert!(!cancel_all);
        assert_eq!(after_ms, 50);
    }

    #[test]
    fn cancel_and_cancel_all_conflict() {
        let res = Cli::try_parse_from(["courier", "fetch", "/a", "--cancel", "/a", "--cancel-all"]);
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn cancel_waits_for_registration_count() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let settled = AtomicUsize::new(0);

        // Nothing tracked: returns at once.
        wait_until_tracked(&client, 0, &settled).await;

        // Requests that already settled count as registered.
        settled.store(2, Ordering::Release);
        wait_until_tracked(&client, 2, &settled).await;
    }

    #[tokio::test]
    async fn cancel_waits_while_requests_are_unregistered() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let settled = AtomicUsize::new(0);

        let waited = tokio::time::timeout(
            Duration::from_millis(20),
            wait_until_tracked(&client, 1, &settled),
        )
        .await;
        assert!(waited.is_err(), "must keep waiting until the request registers");
    }

    #[test]
    fn weather_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from(["courier", "weather", "--lat", "35.5", "--lon", "-78.5"])
            .unwrap();
        assert!(matches!(cli.command, Command::Weather { ref lon, .. } if lon == "-78.5"));
    }
}
