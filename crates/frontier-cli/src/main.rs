use std::fs::File;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::{env, io};

use anyhow::anyhow;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use frontier_crawler::{crawl_site, CrawlSummary, CrawlerConfig, Fetcher, Throttle};
use tokio::runtime;
use tokio::sync::Semaphore;

mod demo;
mod http;
mod report;

use http::{HttpFetcher, HttpFetcherConfig};

/// Bounded-depth concurrent crawler
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    #[command(name = "crawl")]
    Crawl(CrawlArgs),
    #[command(hide = true)]
    Completion,
}

/// Crawl pages from a seed and print each page as soon as it is fetched
#[derive(Debug, clap::Args)]
#[command(group = clap::ArgGroup::new("throttle").multiple(false))]
pub struct CrawlArgs {
    /// Page to start crawling from
    #[arg(required_unless_present = "demo")]
    pub seed: Option<String>,
    /// Crawl canned golang.org pages instead of the network
    #[arg(long, conflicts_with = "user_agent")]
    pub demo: bool,
    /// Optional crawler yaml configuration file
    #[arg(env = "FRONTIER_CRAWLER_CONFIG", long)]
    pub crawler_config: Option<PathBuf>,
    /// Override crawler's maximum depth
    #[arg(long, short)]
    pub depth: Option<usize>,
    /// Throttle to this many concurrent fetches
    #[arg(long, group = "throttle")]
    pub concurrent: Option<NonZeroUsize>,
    /// Throttle to this many fetches per second
    #[arg(long, group = "throttle")]
    pub per_second: Option<NonZeroUsize>,
    /// Throttle with a delay in seconds between fetches
    #[arg(long, group = "throttle")]
    pub delay: Option<f32>,
    /// Custom user agent to download pages
    #[arg(long)]
    pub user_agent: Option<String>,
    /// Give up on the whole crawl after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Print outcomes as json lines
    #[arg(long)]
    pub json: bool,
    /// When quiet no logs are outputted
    #[arg(long, short)]
    pub quiet: bool,
}

impl TryFrom<&CrawlArgs> for CrawlerConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlArgs) -> Result<Self, Self::Error> {
        let mut conf = if let Some(file) = args.crawler_config.as_ref().map(File::open) {
            serde_yaml::from_reader(file?)?
        } else {
            CrawlerConfig::default()
        };
        if let Some(depth) = args.depth {
            conf.max_depth = depth;
        }
        if let Some(n) = args.concurrent {
            conf.throttle = Some(Throttle::Concurrent(n));
        }
        if let Some(n) = args.per_second {
            conf.throttle = Some(Throttle::PerSecond(n));
        }
        if let Some(delay) = args.delay {
            if !delay.is_finite() || delay <= 0.0 {
                anyhow::bail!("Invalid delay: {delay}, expected a positive number of seconds");
            }
            conf.throttle = Some(Throttle::Delay(delay));
        }
        match conf.throttle {
            Some(Throttle::Concurrent(n) | Throttle::PerSecond(n))
                if n.get() > Semaphore::MAX_PERMITS =>
            {
                anyhow::bail!(
                    "Invalid throttle: {n}, expected at most {}",
                    Semaphore::MAX_PERMITS
                );
            }
            _ => (),
        }
        Ok(conf)
    }
}

impl From<&CrawlArgs> for HttpFetcherConfig {
    fn from(args: &CrawlArgs) -> Self {
        let mut conf = HttpFetcherConfig::default();
        if let Some(user_agent) = &args.user_agent {
            conf.user_agent = user_agent.to_string();
        }
        conf
    }
}

async fn run_crawl<F>(
    fetcher: F,
    seed: String,
    conf: &CrawlerConfig,
    args: &CrawlArgs,
) -> anyhow::Result<CrawlSummary>
where
    F: Fetcher<Id = String>,
{
    let json = args.json;
    let crawling = crawl_site(Arc::new(fetcher), seed, conf, |outcome| {
        report::print(&outcome, json)
    });
    let crawling = async {
        match args.timeout.map(Duration::from_secs) {
            Some(limit) => tokio::time::timeout(limit, crawling)
                .await
                .map_err(|_| anyhow!("Crawl timed out after {}s", limit.as_secs())),
            None => Ok(crawling.await),
        }
    };

    tokio::select! {
        res = crawling => res,
        _ = tokio::signal::ctrl_c() => Err(anyhow!("Interrupted")),
    }
}

pub fn crawl(args: CrawlArgs) -> anyhow::Result<CrawlSummary> {
    let crawler_conf = CrawlerConfig::try_from(&args)?;
    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(async {
        if args.demo {
            let seed = args.seed.clone().unwrap_or_else(|| demo::DEMO_SEED.into());
            run_crawl(demo::golang_site(), seed, &crawler_conf, &args).await
        } else {
            let seed = args
                .seed
                .clone()
                .ok_or_else(|| anyhow!("Missing `seed`"))?;
            let fetcher = HttpFetcher::new(&HttpFetcherConfig::from(&args))?;
            run_crawl(fetcher, seed, &crawler_conf, &args).await
        }
    })
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.cmd {
        SubCommand::Crawl(args) => {
            if !args.quiet {
                env::set_var("RUST_LOG", "frontier_crawler=warn,frontier=warn");
                env_logger::init();
            }
            let summary = crawl(args)?;
            eprintln!("{}", report::summary(&summary));
            Ok(())
        }
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "frontier", &mut io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn crawl_args(argv: &[&str]) -> CrawlArgs {
        let argv = ["frontier", "crawl"].iter().chain(argv);
        match Args::try_parse_from(argv).unwrap().cmd {
            SubCommand::Crawl(args) => args,
            SubCommand::Completion => panic!("Expected crawl arguments"),
        }
    }

    #[test]
    fn cli_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn seed_or_demo_required() {
        assert!(Args::try_parse_from(["frontier", "crawl"]).is_err());
        assert!(crawl_args(&["--demo"]).seed.is_none());
        assert_eq!(
            Some("https://example.com/".to_string()),
            crawl_args(&["https://example.com/"]).seed
        );
    }

    #[test]
    fn single_throttle() {
        let res = Args::try_parse_from([
            "frontier",
            "crawl",
            "--demo",
            "--concurrent",
            "2",
            "--per-second",
            "3",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let args = crawl_args(&["--demo", "--depth", "2", "--per-second", "5"]);
        let conf = CrawlerConfig::try_from(&args).unwrap();

        assert_eq!(2, conf.max_depth);
        assert_eq!(
            Some(Throttle::PerSecond(NonZeroUsize::new(5).unwrap())),
            conf.throttle
        );
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "maxDepth: 7").unwrap();
        writeln!(file, "throttle:").unwrap();
        writeln!(file, "  Concurrent: 3").unwrap();
        let path = file.path().to_str().unwrap();

        let args = crawl_args(&["--demo", "--crawler-config", path]);
        let conf = CrawlerConfig::try_from(&args).unwrap();
        assert_eq!(7, conf.max_depth);
        assert_eq!(
            Some(Throttle::Concurrent(NonZeroUsize::new(3).unwrap())),
            conf.throttle
        );

        let args = crawl_args(&["--demo", "--crawler-config", path, "--delay", "0.5"]);
        let conf = CrawlerConfig::try_from(&args).unwrap();
        assert_eq!(7, conf.max_depth);
        assert_eq!(Some(Throttle::Delay(0.5)), conf.throttle);
    }

    #[test]
    fn invalid_delay() {
        let args = crawl_args(&["--demo", "--delay", "0"]);
        assert!(CrawlerConfig::try_from(&args).is_err());
    }

    #[test]
    fn user_agent_override() {
        let args = crawl_args(&["https://example.com/", "--user-agent", "tester"]);
        assert_eq!("tester", HttpFetcherConfig::from(&args).user_agent);
        assert!(Args::try_parse_from(["frontier", "crawl", "--demo", "--user-agent", "x"]).is_err());
    }

    #[test]
    fn oversized_throttle() {
        let huge = usize::MAX.to_string();
        let args = crawl_args(&["--demo", "--concurrent", &huge]);
        assert!(CrawlerConfig::try_from(&args).is_err());
        let args = crawl_args(&["--demo", "--per-second", &huge]);
        assert!(CrawlerConfig::try_from(&args).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "throttle:").unwrap();
        writeln!(file, "  Concurrent: {huge}").unwrap();
        let path = file.path().to_str().unwrap();
        let args = crawl_args(&["--demo", "--crawler-config", path]);
        assert!(CrawlerConfig::try_from(&args).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn crawl_deadline() {
        let args = crawl_args(&["--demo", "--quiet", "--timeout", "0"]);
        let conf = CrawlerConfig::try_from(&args).unwrap();

        let err = run_crawl(demo::golang_site(), demo::DEMO_SEED.into(), &conf, &args)
            .await
            .unwrap_err();
        assert_eq!("Crawl timed out after 0s", err.to_string());

        let args = crawl_args(&["--demo", "--quiet", "--timeout", "60"]);
        let summary = run_crawl(demo::golang_site(), demo::DEMO_SEED.into(), &conf, &args)
            .await
            .unwrap();
        assert_eq!(4, summary.found);
        assert_eq!(1, summary.not_found);
    }

    #[test]
    fn demo_crawl() {
        let args = crawl_args(&["--demo", "--quiet", "--concurrent", "2"]);
        let summary = crawl(args).unwrap();

        assert_eq!(4, summary.found);
        assert_eq!(1, summary.not_found);
    }
}
