use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use socks4_harvest::{
    harvest,
    proxy::{
        accepted_endpoints, save_endpoints, CheckerConfig, CrawlerConfig, ProxyChecker,
        ProxyCrawler, ProxyParser, DEFAULT_SOURCE_URL,
    },
    Config,
};
use std::path::PathBuf;
use std::time::Duration;

/// Scrapes SOCKS4 proxy listings and verifies them concurrently
#[derive(Parser)]
#[command(name = "socks4-harvest")]
#[command(about = "Scrapes SOCKS4 proxy listings and verifies them concurrently")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape, verify and save (the default)
    Run(RunArgs),
    /// Scrape listing pages and save the candidates without verifying
    Crawl {
        /// Listing pages to scrape (can specify multiple)
        #[arg(short, long = "url", default_value = DEFAULT_SOURCE_URL)]
        urls: Vec<String>,
        /// Output file for scraped proxies
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Timeout in seconds for HTTP requests
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
    /// Verify proxies from a file and save results
    Check {
        /// Input file containing proxies
        input: PathBuf,
        /// Output file for good proxies
        #[arg(short, long)]
        good: Option<PathBuf>,
        /// Output file for bad proxies
        #[arg(short, long)]
        bad: Option<PathBuf>,
        #[command(flatten)]
        check: CheckArgs,
    },
}

#[derive(Args, Clone)]
struct RunArgs {
    /// Listing pages to scrape (can specify multiple)
    #[arg(short, long = "url", default_value = DEFAULT_SOURCE_URL)]
    urls: Vec<String>,
    /// Output file for every scraped proxy
    #[arg(long, default_value = "all_scraped_proxies.txt")]
    all: PathBuf,
    /// Output file for verified proxies
    #[arg(long, default_value = "valid_socks4_proxies.txt")]
    valid: PathBuf,
    /// Timeout in seconds for fetching listing pages
    #[arg(long, default_value = "30")]
    crawl_timeout: u64,
    #[command(flatten)]
    check: CheckArgs,
}

#[derive(Args, Clone)]
struct CheckArgs {
    /// Maximum number of proxies checked at once
    #[arg(short = 'n', long, default_value = "100")]
    concurrency: usize,
    /// Timeout in seconds for each check
    #[arg(long, default_value = "10")]
    timeout: u64,
    /// URL to test proxies against
    #[arg(long, default_value = "http://httpbin.org/ip")]
    test_url: String,
}

impl CheckArgs {
    fn config(&self) -> CheckerConfig {
        CheckerConfig::new()
            .with_concurrency(self.concurrency)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_test_url(self.test_url.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,socks4_harvest=info"),
    )
    .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run(args)) => run(args).await?,
        None => run(cli.run).await?,
        Some(Commands::Crawl {
            urls,
            output,
            timeout,
        }) => {
            let crawler = ProxyCrawler::with_config(
                CrawlerConfig::new().with_timeout(Duration::from_secs(timeout)),
            )?;

            let mut all_endpoints = Vec::new();
            for result in crawler.crawl_urls_with_results(&urls).await {
                match result.error {
                    None => {
                        println!(
                            "Found {} proxies from {}",
                            result.endpoints.len(),
                            result.source
                        );
                        all_endpoints.extend(result.endpoints);
                    }
                    Some(error) => eprintln!("Error crawling {}: {}", result.source, error),
                }
            }

            println!("\nTotal proxies: {}", all_endpoints.len());

            if let Some(output_path) = output {
                save_endpoints(&all_endpoints, &output_path)?;
                println!("Saved proxies to {:?}", output_path);
            } else {
                for endpoint in &all_endpoints {
                    println!("{}", endpoint);
                }
            }
        }
        Some(Commands::Check {
            input,
            good,
            bad,
            check,
        }) => {
            let checker = ProxyChecker::with_config(check.config()).await?;
            let endpoints = ProxyParser::parse_file(&input)?;

            println!("Loaded {} proxies from {:?}", endpoints.len(), input);
            println!(
                "Checking with concurrency {}, timeout: {}s",
                check.concurrency, check.timeout
            );
            println!("Test URL: {}", checker.target().url());
            println!();

            let (good_results, bad_results) = checker.check_and_separate(endpoints).await;

            println!(
                "Results: {} good, {} bad",
                good_results.len(),
                bad_results.len()
            );

            if let Some(good_path) = good {
                save_endpoints(&accepted_endpoints(&good_results), &good_path)?;
                println!("Saved {} good proxies to {:?}", good_results.len(), good_path);
            }

            if let Some(bad_path) = bad {
                let bad_endpoints: Vec<_> = bad_results.iter().map(|r| r.endpoint.clone()).collect();
                save_endpoints(&bad_endpoints, &bad_path)?;
                println!("Saved {} bad proxies to {:?}", bad_endpoints.len(), bad_path);
            }

            if !good_results.is_empty() {
                println!("\nWorking proxies:");
                for result in &good_results {
                    if let Some(time) = result.response_time_ms {
                        println!("  {} ({}ms)", result.endpoint, time);
                    }
                }
            }
        }
    }

    Ok(())
}

async fn run(args: RunArgs) -> Result<()> {
    // Fail on bad settings before touching the network for listings
    let checker = ProxyChecker::with_config(args.check.config()).await?;
    let crawler = ProxyCrawler::with_config(
        CrawlerConfig::new().with_timeout(Duration::from_secs(args.crawl_timeout)),
    )?;

    let config = Config {
        source_urls: args.urls,
        candidates_path: args.all,
        accepted_path: args.valid,
    };

    println!("Starting proxy scraping...");
    let summary = harvest(&config, &crawler, &checker).await?;

    if summary.candidates.is_empty() {
        println!("\nNo SOCKS4 proxies scraped.");
        return Ok(());
    }

    println!(
        "\nScraped {} SOCKS4 proxies, saved to {:?}.",
        summary.candidates.len(),
        config.candidates_path
    );

    let accepted = summary.accepted();
    println!(
        "Checked {} proxies: {} valid, {} invalid.",
        summary.outcomes.len(),
        accepted.len(),
        summary.rejected_count()
    );

    if accepted.is_empty() {
        println!("\nNo valid SOCKS4 proxies found.");
    } else {
        println!("\nFound {} valid SOCKS4 proxies:", accepted.len());
        for endpoint in &accepted {
            println!("{}", endpoint);
        }
        println!("\nProxies have been saved to {:?}.", config.accepted_path);
    }

    Ok(())
}
