use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use spotify2ytmusic::spotify::auth::authorize_url;
use spotify2ytmusic::storage::initialize;
use spotify2ytmusic::{
    ChromeSurface, Config, DestinationAutomator, Dispatcher, FileStore, KeyValueStore,
    RelayTokenBroker, Request, Response, SourceCatalog, SpotifyClient, TokenStore,
    TransferHistory, TransferOrchestrator, TransferReport,
};

type CliDispatcher = Dispatcher<RelayTokenBroker, SpotifyClient, DestinationAutomator<ChromeSurface>>;

#[derive(Parser)]
#[command(name = "spotify2ytmusic")]
#[command(about = "Transfer Spotify playlists to YouTube Music")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Relay base URL (overrides the configured one)
    #[arg(long, global = true, env = "RELAY_URL")]
    relay_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the token relay (needs SPOTIFY_CLIENT_SECRET)
    Serve,

    /// Log in to Spotify through the relay
    LoginSpotify,

    /// Open YouTube Music in Chrome so you can sign in
    LoginYoutube,

    /// List your Spotify playlists
    ListPlaylists,

    /// Transfer playlists to YouTube Music
    Transfer {
        /// Names or IDs of playlists to transfer
        #[arg(required = true)]
        playlist_names: Vec<String>,

        /// Drive Chrome without a visible window
        #[arg(long)]
        headless: bool,
    },

    /// Show recent transfers
    History {
        /// Number of transfers to show
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Clear transfer history and log out of both services
    Logout,

    /// Show setup guide
    Setup,
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(relay_url) = cli.relay_url {
        config.relay_url = relay_url;
    }

    match cli.command {
        Commands::Serve => {
            spotify2ytmusic::relay::serve(&config)
                .await
                .context("Relay stopped")?;
        }
        Commands::LoginSpotify => login_spotify(&config).await?,
        Commands::LoginYoutube => login_youtube(&config)?,
        Commands::ListPlaylists => list_playlists(&config).await?,
        Commands::Transfer {
            playlist_names,
            headless,
        } => transfer(&config, &playlist_names, headless).await?,
        Commands::History { limit } => show_history(&config, limit)?,
        Commands::Logout => logout(&config).await?,
        Commands::Setup => show_setup_guide(),
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    let store = FileStore::open(&config.store_path).context("Failed to open local store")?;
    initialize(&store).context("Failed to initialize local store")?;
    Ok(Arc::new(store))
}

fn dispatcher(config: &Config, store: &Arc<dyn KeyValueStore>) -> CliDispatcher {
    Dispatcher::new(
        RelayTokenBroker::new(config),
        SpotifyClient::new(config),
        None,
        TokenStore::new(store.clone()),
        TransferHistory::new(store.clone()),
    )
}

async fn access_token(config: &Config, tokens: &TokenStore) -> Result<String> {
    tokens
        .spotify_access_token(&RelayTokenBroker::new(config))
        .await
        .context("No usable Spotify login, run `spotify2ytmusic login-spotify` first")
}

async fn login_spotify(config: &Config) -> Result<()> {
    let missing = config.get_missing_config();
    if !missing.is_empty() {
        println!("{}", "Missing configuration:".red());
        for item in &missing {
            println!("   - {}", item);
        }
        std::process::exit(1);
    }

    let url = authorize_url(config)?;
    println!("\nOpen this URL in your browser to authorize Spotify:");
    println!("{}\n", url);

    print!("Enter the URL you were redirected to: ");
    io::stdout().flush()?;

    let mut redirect_url = String::new();
    io::stdin().read_line(&mut redirect_url)?;

    let store = open_store(config)?;
    let response = dispatcher(config, &store)
        .dispatch(Request::SpotifyAuth {
            redirect_url: redirect_url.trim().to_string(),
        })
        .await;

    match response {
        Response::Auth { .. } => println!("{}", "Spotify connected".green()),
        Response::Error { error } => bail!("Spotify authentication failed: {}", error),
        other => bail!("Unexpected response: {:?}", other),
    }

    Ok(())
}

fn login_youtube(config: &Config) -> Result<()> {
    let _surface = ChromeSurface::launch(&config.ytmusic_url, &config.browser_profile_dir, false)
        .context("Failed to open Chrome")?;

    println!("Log in to YouTube Music in the Chrome window.");
    print!("Press Enter when you are done: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;

    let store = open_store(config)?;
    TokenStore::new(store).mark_youtube_signed_in()?;
    println!("{}", "YouTube Music connected".green());

    Ok(())
}

async fn list_playlists(config: &Config) -> Result<()> {
    println!("{}", "Your Spotify Playlists".cyan().bold());
    println!("{}", "=".repeat(50));

    let store = open_store(config)?;
    let token = access_token(config, &TokenStore::new(store.clone())).await?;

    let playlists = match dispatcher(config, &store)
        .dispatch(Request::GetSpotifyPlaylists { token })
        .await
    {
        Response::Playlists(playlists) => playlists,
        Response::Error { error } => bail!("Failed to fetch playlists: {}", error),
        other => bail!("Unexpected response: {:?}", other),
    };

    if playlists.is_empty() {
        println!("{}", "No playlists found".yellow());
        return Ok(());
    }

    for (i, playlist) in playlists.iter().enumerate() {
        println!(
            "{:2}. {} ({} songs)",
            i + 1,
            playlist.name.green(),
            playlist.track_count
        );
    }

    println!("\n{}", format!("Total: {} playlists", playlists.len()).cyan());

    Ok(())
}

async fn transfer(config: &Config, playlist_names: &[String], headless: bool) -> Result<()> {
    println!("{}", "Spotify to YouTube Music Playlist Transfer".cyan().bold());
    println!("{}", "=".repeat(50));
    println!("Target playlists: {}", playlist_names.join(", "));

    let store = open_store(config)?;
    let tokens = TokenStore::new(store.clone());
    let token = access_token(config, &tokens).await?;

    if !tokens.youtube_signed_in()? {
        warn!("YouTube Music login not recorded; run `spotify2ytmusic login-youtube` if adding fails");
    }

    let catalog = SpotifyClient::new(config);
    let all_playlists = catalog
        .list_playlists(&token)
        .await
        .context("Failed to fetch playlists")?;

    let targets: Vec<_> = playlist_names
        .iter()
        .filter_map(|name| {
            let found = all_playlists
                .iter()
                .find(|p| p.name.to_lowercase() == name.to_lowercase() || p.id == *name);
            if found.is_none() {
                warn!("Playlist not found: {}", name);
            }
            found
        })
        .collect();

    if targets.is_empty() {
        println!("{}", "No valid playlists found to transfer".yellow());
        return Ok(());
    }

    let surface = ChromeSurface::launch(&config.ytmusic_url, &config.browser_profile_dir, headless)
        .context("Failed to open YouTube Music in Chrome")?;
    let mut orchestrator = TransferOrchestrator::new(
        catalog,
        DestinationAutomator::new(surface),
        TransferHistory::new(store.clone()),
    );

    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
        .progress_chars("#>-");

    let mut reports = Vec::new();
    for playlist in targets {
        println!("\n{} {}", "Transferring:".bold(), playlist.name);

        let pb = ProgressBar::new(100);
        pb.set_style(style.clone());

        let result = orchestrator
            .transfer(playlist, &token, |progress| {
                pb.set_position(progress.percent.round() as u64);
                pb.set_message(format!(
                    "{} (matched {}, not found {})",
                    progress.status, progress.matched, progress.not_found
                ));
            })
            .await;

        match result {
            Ok(report) => {
                pb.finish_with_message("Transfer complete");
                reports.push(report);
            }
            Err(e) => {
                pb.abandon_with_message(format!("Error: {}", e));
                println!("{} {}", "Transfer failed:".red(), e);
            }
        }
    }

    if !reports.is_empty() {
        save_transfer_results(&reports)?;
        print_summary(&reports);
    }

    Ok(())
}

fn save_transfer_results(reports: &[TransferReport]) -> Result<()> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let results_dir = Path::new("transfer_results");

    fs::create_dir_all(results_dir)?;

    let filename = results_dir.join(format!("transfer_results_{}.json", timestamp));
    let json = serde_json::to_string_pretty(reports)?;

    fs::write(&filename, json)?;

    println!("Transfer results saved to: {}", filename.display());

    Ok(())
}

fn print_summary(reports: &[TransferReport]) {
    let total_tracks: usize = reports.iter().map(|r| r.record.tracks_total).sum();
    let total_matched: usize = reports.iter().map(|r| r.record.tracks_matched).sum();
    let total_not_found: usize = reports.iter().map(|r| r.tracks_not_found).sum();

    println!();
    println!("{}", "=".repeat(60));
    println!("{}", "TRANSFER SUMMARY".bold());
    println!("{}", "=".repeat(60));
    println!("Playlists transferred: {}", reports.len());
    println!("Tracks processed: {}", total_tracks);
    println!("Matched: {}", total_matched.to_string().green());
    println!("Not found: {}", total_not_found.to_string().red());
    println!("{}", "=".repeat(60));

    for report in reports {
        let rate = report.record.success_rate();
        let status = if rate >= 90.0 {
            format!("{:.0}%", rate).green()
        } else if rate >= 70.0 {
            format!("{:.0}%", rate).yellow()
        } else {
            format!("{:.0}%", rate).red()
        };

        println!(
            "  {}: {}/{} ({})",
            report.record.playlist_name,
            report.record.tracks_matched,
            report.record.tracks_total,
            status
        );
    }
}

fn show_history(config: &Config, limit: usize) -> Result<()> {
    println!("{}", "Recent Transfers".cyan().bold());
    println!("{}", "=".repeat(50));

    let history = TransferHistory::new(open_store(config)?);
    let records = history.recent(limit)?;

    if records.is_empty() {
        println!("{}", "No transfers yet".yellow());
        return Ok(());
    }

    for record in records {
        println!(
            "{}  {} • {}/{} matched",
            record.timestamp.with_timezone(&Local).format("%Y-%m-%d"),
            record.playlist_name.green(),
            record.tracks_matched,
            record.tracks_total
        );
    }

    Ok(())
}

async fn logout(config: &Config) -> Result<()> {
    let store = open_store(config)?;

    match dispatcher(config, &store).dispatch(Request::ClearStorage).await {
        Response::Error { error } => bail!("Failed to clear storage: {}", error),
        _ => println!("{}", "Cleared history and logged out".green()),
    }

    Ok(())
}

fn show_setup_guide() {
    println!("{}", "Spotify to YouTube Music Setup Guide".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "1. Spotify API Setup".yellow());
    println!("   - Go to https://developer.spotify.com/dashboard/");
    println!("   - Create a new app");
    println!("   - Copy your Client ID and Client Secret");
    println!("   - Add 'http://127.0.0.1:8080/callback' as a redirect URI");

    println!("\n{}", "2. Relay".yellow());
    println!("   - On the machine holding the secret, create a .env file with:");
    println!("     SPOTIFY_CLIENT_ID=your_spotify_client_id");
    println!("     SPOTIFY_CLIENT_SECRET=your_spotify_client_secret");
    println!("     SPOTIFY_REDIRECT_URI=http://127.0.0.1:8080/callback");
    println!("   - Run: spotify2ytmusic serve");

    println!("\n{}", "3. Client".yellow());
    println!("   - Set SPOTIFY_CLIENT_ID and RELAY_URL (default http://localhost:3000)");
    println!("   - spotify2ytmusic login-spotify");
    println!("   - spotify2ytmusic login-youtube");

    println!("\n{}", "4. Usage".yellow());
    println!("   - spotify2ytmusic list-playlists            (to see your playlists)");
    println!("   - spotify2ytmusic transfer \"Playlist Name\"  (to transfer a playlist)");
    println!("   - spotify2ytmusic history                   (recent transfers)");
    println!("   - spotify2ytmusic logout                    (clear everything)");

    println!("\n{}", "Ready to start transferring!".green());
}
