use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use spotify2youtube::auth::correlation::DEFAULT_SWEEP_INTERVAL;
use spotify2youtube::auth::Provider;
use spotify2youtube::migrator::report::format_elapsed;
use spotify2youtube::{
    AuthCoordinator, AuthSession, Config, CorrelationStore, GoogleOAuth, MigrationEvent,
    MigrationOutcome, PlaylistMigrator, PlaylistSource, PrivacyStatus, SpotifyAuth, SpotifyClient,
    YouTubeClient,
};

#[derive(Parser)]
#[command(name = "spotify2youtube")]
#[command(about = "Migrate Spotify playlists to YouTube")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate one Spotify playlist into a new YouTube playlist
    Migrate {
        /// Spotify playlist ID, URI or URL
        playlist: String,

        /// Visibility of the created YouTube playlist
        #[arg(long, value_enum, default_value_t = PrivacyStatus::Private)]
        privacy: PrivacyStatus,

        /// Save the migration report to migration_results/
        #[arg(long)]
        save_report: bool,
    },

    /// List all your Spotify playlists
    ListPlaylists,

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

    match cli.command {
        Commands::Migrate {
            playlist,
            privacy,
            save_report,
        } => {
            migrate(&playlist, privacy, save_report).await?;
        }
        Commands::ListPlaylists => {
            list_playlists().await?;
        }
        Commands::Setup => {
            show_setup_guide();
        }
    }

    Ok(())
}

/// OAuth state for the lifetime of the process.
struct AuthContext {
    coordinator: AuthCoordinator,
    spotify_auth: Arc<SpotifyAuth>,
    _reaper: JoinHandle<()>,
}

impl AuthContext {
    fn new(config: &Config) -> Self {
        let store = Arc::new(CorrelationStore::default());
        let reaper = store.spawn_reaper(DEFAULT_SWEEP_INTERVAL);

        let spotify_auth = Arc::new(SpotifyAuth::new(config));
        let google_oauth = Arc::new(GoogleOAuth::new(config));

        Self {
            coordinator: AuthCoordinator::new(store, spotify_auth.clone(), google_oauth),
            spotify_auth,
            _reaper: reaper,
        }
    }

    async fn authorize(&self, provider: Provider, session: &mut AuthSession) -> Result<()> {
        let request = self.coordinator.begin(provider, session).await?;

        println!("\nOpen this URL in your browser to authorize {}:", provider);
        println!("{}\n", request.url);

        print!("Enter the URL you were redirected to: ");
        io::stdout().flush()?;

        let mut redirect_url = String::new();
        io::stdin().read_line(&mut redirect_url)?;

        let callback = self
            .coordinator
            .parse_callback(&request, &redirect_url)
            .with_context(|| format!("Failed to read {} redirect", provider))?;

        self.coordinator
            .complete(provider, &callback, session)
            .await
            .with_context(|| format!("Failed to authorize {}", provider))?;

        println!("{}", format!("{} connected", provider).green());
        Ok(())
    }
}

fn load_config(require_youtube: bool) -> Result<Config> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let missing: Vec<String> = config
        .get_missing_config()
        .into_iter()
        .filter(|item| require_youtube || item.starts_with("SPOTIFY"))
        .collect();

    if !missing.is_empty() {
        println!("{}", "Missing configuration:".red());
        for item in &missing {
            println!("   - {}", item);
        }
        println!(
            "\n{}",
            "Please copy .env.example to .env and fill in your credentials.".yellow()
        );
        std::process::exit(1);
    }

    Ok(config)
}

async fn migrate(playlist: &str, privacy: PrivacyStatus, save_report: bool) -> Result<()> {
    println!("{}", "Spotify to YouTube Playlist Migrator".cyan().bold());
    println!("{}", "=".repeat(50));

    let config = load_config(true)?;
    let playlist_id = SpotifyClient::parse_playlist_id(playlist)?;

    if config.youtube_api_key.is_none() {
        println!(
            "{}",
            "YOUTUBE_API_KEY not set - searches will use your account quota".yellow()
        );
    }

    let auth = AuthContext::new(&config);
    let mut session = AuthSession::default();
    auth.authorize(Provider::Spotify, &mut session).await?;
    auth.authorize(Provider::YouTube, &mut session).await?;

    let (Some(spotify_credentials), Some(youtube_credentials)) =
        (&session.spotify, &session.youtube)
    else {
        bail!("Both Spotify and YouTube must be authorized before migrating");
    };

    let source = SpotifyClient::from_credentials(spotify_credentials);
    let destination = YouTubeClient::new(
        youtube_credentials,
        config.youtube_api_key.clone(),
        config.search_strategy(),
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let bar = pb.clone();
    let migrator = PlaylistMigrator::new(source, destination, config.migration_options())
        .with_progress(move |event| render_event(&bar, event));

    println!("\nMigrating as a {} playlist...\n", privacy);

    let outcome = migrator
        .migrate(&playlist_id, privacy)
        .await
        .context("Migration failed")?;

    pb.finish_and_clear();

    if save_report {
        save_migration_report(&outcome)?;
    }
    print_summary(&outcome);

    Ok(())
}

fn render_event(pb: &ProgressBar, event: &MigrationEvent) {
    match event {
        MigrationEvent::SourceLoaded { name, total } => {
            pb.set_length(*total as u64);
            pb.println(format!("Playlist found: \"{}\" ({} tracks)", name, total));
        }
        MigrationEvent::PlaylistCreated { url, .. } => {
            pb.println(format!("Playlist created: {}", url));
        }
        MigrationEvent::Track(progress) => {
            pb.inc(1);
            pb.set_message(format!("{} - {}", progress.track.name, progress.track.artist));
            if !progress.success {
                pb.println(format!(
                    "  {} {} - {}: {}",
                    "x".red(),
                    progress.track.name,
                    progress.track.artist,
                    progress.reason.as_deref().unwrap_or("unknown error")
                ));
            }
        }
        MigrationEvent::Finished { .. } => {
            pb.set_message("done");
        }
    }
}

fn save_migration_report(outcome: &MigrationOutcome) -> Result<()> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let results_dir = Path::new("migration_results");

    std::fs::create_dir_all(results_dir)?;

    let filename = results_dir.join(format!("migration_results_{}.json", timestamp));
    let json = serde_json::to_string_pretty(outcome)?;

    std::fs::write(&filename, json)?;

    println!("Migration report saved to: {}", filename.display());

    Ok(())
}

fn print_summary(outcome: &MigrationOutcome) {
    println!();
    println!("{}", "=".repeat(60));
    println!("{}", "MIGRATION SUMMARY".bold());
    println!("{}", "=".repeat(60));
    println!("Playlist: {}", outcome.playlist_name);
    println!("Total tracks: {}", outcome.total_tracks);
    println!(
        "Successfully added: {}",
        outcome.successfully_added.to_string().green()
    );
    println!("Failed: {}", outcome.failed.to_string().red());

    let rate = format!("{:.1}%", outcome.success_rate());
    let rate = if outcome.success_rate() >= 90.0 {
        rate.green()
    } else if outcome.success_rate() >= 70.0 {
        rate.yellow()
    } else {
        rate.red()
    };
    println!("Success rate: {}", rate);
    println!("Elapsed: {}", format_elapsed(outcome.elapsed()));
    println!("Playlist URL: {}", outcome.youtube_playlist_url);
    println!("{}", "=".repeat(60));

    if !outcome.failed_tracks.is_empty() {
        println!("\n{}", "Tracks that failed:".yellow());
        for (i, failed) in outcome.failed_tracks.iter().enumerate() {
            println!("  {}. {} - {}", i + 1, failed.track, failed.artist);
            println!("     Reason: {}", failed.reason);
        }
    }

    if outcome.quota_failures() > 0 {
        println!(
            "\n{}",
            "Some tracks hit the YouTube quota. It resets daily; run the migration again after the reset."
                .yellow()
        );
    }
}

async fn list_playlists() -> Result<()> {
    println!("{}", "Your Spotify Playlists".cyan().bold());
    println!("{}", "=".repeat(50));

    let config = load_config(false)?;

    let auth = AuthContext::new(&config);
    let mut session = AuthSession::default();
    auth.authorize(Provider::Spotify, &mut session).await?;

    let Some(credentials) = session.spotify.clone() else {
        bail!("Spotify is not authorized");
    };

    let playlists = match SpotifyClient::from_credentials(&credentials)
        .get_user_playlists()
        .await
    {
        Ok(playlists) => playlists,
        Err(e) if credentials.refresh_token.is_some() => {
            warn!("Fetching playlists failed ({}), refreshing Spotify token", e);
            let refreshed = auth.spotify_auth.refresh(&credentials).await?;
            SpotifyClient::from_credentials(&refreshed)
                .get_user_playlists()
                .await
                .context("Failed to fetch playlists")?
        }
        Err(e) => return Err(e).context("Failed to fetch playlists"),
    };

    if playlists.is_empty() {
        println!("{}", "No playlists found".yellow());
        return Ok(());
    }

    for (i, playlist) in playlists.iter().enumerate() {
        println!(
            "{:2}. {} ({} tracks)",
            i + 1,
            playlist.name.green(),
            playlist.track_count
        );
        println!("     ID: {}", playlist.id.cyan());
    }

    println!("\n{}", format!("Total: {} playlists", playlists.len()).cyan());

    Ok(())
}

fn show_setup_guide() {
    println!("{}", "Spotify to YouTube Migrator Setup Guide".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "1. Spotify API Setup".yellow());
    println!("   - Go to https://developer.spotify.com/dashboard/");
    println!("   - Create a new app");
    println!("   - Copy your Client ID and Client Secret");
    println!("   - Add 'http://127.0.0.1:8888/callback' as a redirect URI");

    println!("\n{}", "2. Google / YouTube API Setup".yellow());
    println!("   - Go to https://console.cloud.google.com/");
    println!("   - Enable the YouTube Data API v3");
    println!("   - Create an OAuth client ID (Web application)");
    println!("   - Add 'http://127.0.0.1:8888/google-callback' as a redirect URI");
    println!("   - Optionally create an API key for searches");

    println!("\n{}", "3. Configuration".yellow());
    println!("   - Create a .env file with:");
    println!("     SPOTIFY_CLIENT_ID=your_spotify_client_id");
    println!("     SPOTIFY_CLIENT_SECRET=your_spotify_client_secret");
    println!("     SPOTIFY_REDIRECT_URI=http://127.0.0.1:8888/callback");
    println!("     GOOGLE_CLIENT_ID=your_google_client_id");
    println!("     GOOGLE_CLIENT_SECRET=your_google_client_secret");
    println!("     GOOGLE_REDIRECT_URI=http://127.0.0.1:8888/google-callback");
    println!("     YOUTUBE_API_KEY=your_api_key            (optional)");
    println!("     TRACK_DELAY_MS=1000                     (optional, minimum 1000)");
    println!("     SEARCH_CREDENTIAL_ORDER=app,user        (optional)");

    println!("\n{}", "4. Usage".yellow());
    println!("   - spotify2youtube list-playlists                      (to see your playlists)");
    println!("   - spotify2youtube migrate <playlist-id-or-url>        (private playlist)");
    println!("   - spotify2youtube migrate <playlist> --privacy public (public playlist)");

    println!(
        "\n{}",
        "Each track takes at least a second; large playlists can use a full day of YouTube quota."
            .yellow()
    );
    println!("\n{}", "Ready to start migrating!".green());
}
