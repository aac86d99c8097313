// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Lonkero WP - WordPress Enumeration CLI
 * Plugin, theme, timthumb and user enumeration with optional password testing
 *
 * For authorized assessments only.
 *
 * (c) 2026 Bountyy Oy
 */

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, Level};

use lonkero_wpscan::config::{load_config, AppConfig, ConfigValidator};
use lonkero_wpscan::models::{Item, ItemCollection, VulnerabilityMatchable};
use lonkero_wpscan::progress::{
    ChannelProgress, NullProgress, ProgressEvent, ProgressSink, TracingProgress,
};
use lonkero_wpscan::scanners::brute_force::BruteForceOptions;
use lonkero_wpscan::scanners::wordpress::{
    BruteForceSettings, EnumerationPlan, ScanReport, WordPressScanner, DEFAULT_ENUMERATION,
};
use lonkero_wpscan::ScanContext;

/// Lonkero WP - WordPress enumeration and credential testing
#[derive(Parser)]
#[command(name = "lonkero-wp")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version)]
#[command(about = "WordPress plugin, theme, timthumb and user enumeration", long_about = None)]
struct Cli {
    /// Target WordPress URL
    #[arg(short, long)]
    url: String,

    /// Skip the WordPress check
    #[arg(short, long)]
    force: bool,

    /// What to enumerate: p,vp,ap,t,vt,at,tt,u,u[a-b] (comma separated)
    #[arg(short, long, default_value = DEFAULT_ENUMERATION)]
    enumerate: String,

    /// Discard aggressive matches whose body matches this regex
    #[arg(long)]
    exclude_content_based: Option<String>,

    /// Configuration file (yaml, toml or json)
    #[arg(long)]
    config_file: Option<PathBuf>,

    #[arg(long)]
    user_agent: Option<String>,

    /// Pick a random browser User-Agent
    #[arg(long)]
    random_agent: bool,

    #[arg(long)]
    cookie: Option<String>,

    /// Follow a homepage redirection instead of stopping
    #[arg(long)]
    follow_redirection: bool,

    #[arg(long)]
    wp_content_dir: Option<String>,

    #[arg(long)]
    wp_plugins_dir: Option<String>,

    /// Proxy, [protocol://]host:port
    #[arg(long)]
    proxy: Option<String>,

    /// Proxy credentials, user:pass
    #[arg(long)]
    proxy_auth: Option<String>,

    /// HTTP basic auth, user:pass
    #[arg(long)]
    basic_auth: Option<String>,

    /// Password list for credential testing
    #[arg(short, long)]
    wordlist: Option<PathBuf>,

    /// Only test this login (all enumerated users otherwise)
    #[arg(short = 'U', long)]
    username: Option<String>,

    /// Maximum requests in flight
    #[arg(short, long, visible_alias = "max-threads")]
    threads: Option<usize>,

    /// Response cache lifetime in seconds, 0 disables the cache
    #[arg(long)]
    cache_ttl: Option<u64>,

    /// Request timeout in milliseconds
    #[arg(long)]
    request_timeout: Option<u64>,

    /// Connect timeout in milliseconds
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// Directory with candidate lists and vulnerability databases
    #[arg(long, env = "WPSCAN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Write the JSON report here
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    no_color: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - only the final result
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_ansi(!cli.no_color)
        .init();

    let palette = Palette::new(!cli.no_color);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("lonkero-wp")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{} {}", palette.red("[ERROR]"), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(async_main(cli, palette)) {
        eprintln!("{} {:#}", palette.red("[ERROR]"), e);
        std::process::exit(1);
    }
}

async fn async_main(cli: Cli, palette: Palette) -> Result<()> {
    let mut config = load_config(cli.config_file.as_deref())?;
    apply_cli_overrides(&mut config, &cli);
    ConfigValidator::validate_app_config(&config)?;

    let plan: EnumerationPlan = cli.enumerate.parse()?;

    if cli.username.is_some() && cli.wordlist.is_none() {
        bail!("--username needs a --wordlist");
    }
    if let Some(wordlist) = &cli.wordlist {
        if !wordlist.is_file() {
            bail!("The wordlist {} does not exist", wordlist.display());
        }
    }

    let show_progression = !cli.quiet;
    let (progress, renderer) = if cli.quiet {
        (Arc::new(NullProgress) as Arc<dyn ProgressSink>, None)
    } else if !std::io::stderr().is_terminal() {
        let sink = TracingProgress::new().with_lines(std::io::stderr());
        (Arc::new(sink) as Arc<dyn ProgressSink>, None)
    } else {
        let (sink, receiver) = ChannelProgress::new();
        (
            Arc::new(sink) as Arc<dyn ProgressSink>,
            Some(tokio::spawn(render_progress(receiver))),
        )
    };

    let ctx = ScanContext::from_config(&config)?.with_progress(progress);
    let scanner = WordPressScanner::new(ctx, &config).with_progression(show_progression);

    let brute_force = cli.wordlist.clone().map(|wordlist| BruteForceSettings {
        wordlist,
        username: cli.username.clone(),
        options: BruteForceOptions {
            verbose: cli.verbose,
            show_progression,
            redirect_url: None,
        },
    });

    if !cli.quiet {
        println!("{} URL: {}", palette.green("[+]"), cli.url);
        println!(
            "{} Started: {}",
            palette.green("[+]"),
            chrono::Local::now().format("%a %b %e %H:%M:%S %Y")
        );
        println!();
    }

    let result = scanner.run(&cli.url, &plan, brute_force.as_ref()).await;

    // Closes the progress channel
    drop(scanner);
    if let Some(renderer) = renderer {
        let _ = renderer.await;
    }

    let report = result?;
    print_report(&report, &palette, cli.quiet);

    if let Some(path) = &cli.output {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        debug!("Report written to {}", path.display());
    }

    Ok(())
}

fn apply_cli_overrides(config: &mut AppConfig, cli: &Cli) {
    let scanner = &mut config.scanner;
    if let Some(threads) = cli.threads {
        scanner.max_threads = threads;
    }
    scanner.force |= cli.force;
    scanner.follow_redirection |= cli.follow_redirection;
    if cli.wp_content_dir.is_some() {
        scanner.wp_content_dir = cli.wp_content_dir.clone();
    }
    if cli.wp_plugins_dir.is_some() {
        scanner.wp_plugins_dir = cli.wp_plugins_dir.clone();
    }
    if cli.exclude_content_based.is_some() {
        scanner.exclude_content_based = cli.exclude_content_based.clone();
    }

    let http = &mut config.http;
    if let Some(ttl) = cli.cache_ttl {
        http.cache_ttl_secs = ttl;
    }
    if let Some(timeout) = cli.request_timeout {
        http.request_timeout_ms = timeout;
    }
    if let Some(timeout) = cli.connect_timeout {
        http.connect_timeout_ms = timeout;
    }
    if cli.user_agent.is_some() {
        http.user_agent = cli.user_agent.clone();
    }
    http.random_user_agent |= cli.random_agent;
    for (slot, value) in [
        (&mut http.cookie, &cli.cookie),
        (&mut http.proxy, &cli.proxy),
        (&mut http.proxy_auth, &cli.proxy_auth),
        (&mut http.basic_auth, &cli.basic_auth),
    ] {
        if value.is_some() {
            *slot = value.clone();
        }
    }

    if let Some(data_dir) = &cli.data_dir {
        config.paths.data_dir = data_dir.clone();
    }
}

/// Drains the progress channel into a bar and status lines
async fn render_progress(mut receiver: UnboundedReceiver<ProgressEvent>) {
    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = receiver.recv().await {
        match event {
            ProgressEvent::Started { label, total } => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{msg} [{wide_bar:.cyan/blue}] {pos}/{len} ({elapsed_precise})")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                pb.set_message(label);
                if let Some(previous) = bar.replace(pb) {
                    previous.finish_and_clear();
                }
            }
            ProgressEvent::Advanced => {
                if let Some(pb) = &bar {
                    pb.inc(1);
                }
            }
            ProgressEvent::Message(line) => match &bar {
                Some(pb) => pb.println(line),
                None => eprintln!("{}", line),
            },
            ProgressEvent::Finished => {
                if let Some(pb) = bar.take() {
                    pb.finish_and_clear();
                }
            }
        }
    }

    if let Some(pb) = bar.take() {
        pb.finish_and_clear();
    }
}

fn print_report(report: &ScanReport, palette: &Palette, quiet: bool) {
    if !quiet {
        println!("{} WordPress content directory: {}", palette.green("[+]"), report.wp_content_dir);
        println!();
    }

    if let Some(plugins) = &report.plugins {
        print_items("plugins", plugins, palette);
    }
    if let Some(themes) = &report.themes {
        print_items("themes", themes, palette);
    }
    if let Some(timthumbs) = &report.timthumbs {
        print_items("timthumbs", timthumbs, palette);
    }
    if let Some(users) = &report.users {
        if users.is_empty() {
            println!("{} No users found", palette.yellow("[!]"));
        } else {
            println!("{} Enumerated {} users:", palette.green("[+]"), users.len());
            for user in users.sorted() {
                match user.id {
                    Some(id) => println!(" | Id: {:<4} Login: {}", id, user.name),
                    None => println!(" | Login: {}", user.name),
                }
            }
        }
        println!();
    }

    for result in &report.brute_force {
        match &result.password {
            Some(password) => println!(
                "{} Login: {} Password: {}",
                palette.green("[SUCCESS]"),
                result.login,
                password
            ),
            None => println!(
                "{} No password found for {} ({} attempts, {} errors)",
                palette.yellow("[!]"),
                result.login,
                result.attempts,
                result.errors
            ),
        }
    }

    if !quiet {
        println!();
        println!(
            "{} Finished in {:.1}s, {} requests without response",
            palette.green("[+]"),
            report.duration_ms as f64 / 1000.0,
            report.requests_failed
        );
    }
}

fn print_items(label: &str, items: &ItemCollection, palette: &Palette) {
    if items.is_empty() {
        println!("{} No {} found", palette.yellow("[!]"), label);
        println!();
        return;
    }

    println!("{} {} {} found:", palette.green("[+]"), items.len(), label);
    for item in items.sorted() {
        print_item(item, palette);
    }
    println!();
}

fn print_item(item: &Item, palette: &Palette) {
    let marker = if item.confirmed { "" } else { " (passive)" };
    println!(" | Name: {}{}", palette.bold(&item.name), marker);
    println!(" |  Location: {}", item.uri);
    if let Some(version) = &item.version {
        println!(" |  Version: {}", version);
    }

    for vuln in item.vulnerabilities() {
        if !vuln.affects(item.version()) {
            continue;
        }
        println!(" |  {} Title: {}", palette.red("[!]"), vuln.title);
        if let Some(fixed_in) = &vuln.fixed_in {
            println!(" |     Fixed in: {}", fixed_in);
        }
        for reference in &vuln.references {
            println!(" |     Reference: {}", reference);
        }
    }
}

#[derive(Clone, Copy)]
struct Palette {
    enabled: bool,
}

impl Palette {
    fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    fn red(&self, text: &str) -> String {
        self.paint("91", text)
    }

    fn green(&self, text: &str) -> String {
        self.paint("92", text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint("93", text)
    }

    fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }
}
