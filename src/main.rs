use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use unmark::album::{Album, AlbumError};
use unmark::api::{ApiClient, ApiError};
use unmark::auth::{self, AuthClient, AuthError, SessionState};
use unmark::config::{self, AppConfig, CropConfig};
use unmark::history::Ledger;
use unmark::imaging::{
    Dimensions, DisplayRect, DisplaySize, ImageBackend, Preset, Rectangle, RegionInput,
    RustBackend, fit_display_size, process_selected,
};
use unmark::output;
use unmark::parse;
use unmark::platform;
use unmark::storage::FileStore;
use unmark::types::{LocalKind, MediaKind, SelectedMedia, is_video_name};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "unmark")]
#[command(version)]
#[command(about = "Remove watermarks from short-video share links and local images")]
#[command(long_about = "\
Remove watermarks from short-video share links and local images

Paste a share link (or the whole share caption) to get direct, watermark-free
media URLs, or cut a watermark band out of a local image. Every result is
kept in a local history that can be browsed and saved to the album.

Supported platforms: Douyin, Kuaishou, Xiaohongshu, Weibo, Pipixia, Xigua.

Examples:

  unmark parse '复制打开抖音 https://v.douyin.com/iRNBho5/ 看看'
  unmark crop photo.jpg --preset bottom --save
  unmark crop photo.jpg --y 1820 --height 100
  unmark history list

Logging goes to stderr. Use -v / -vv or set UNMARK_LOG (e.g. UNMARK_LOG=debug).

Run 'unmark gen-config' to generate a documented unmark.toml.")]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Identify the platform of a link or share caption
    Identify {
        /// Link or share text
        text: Vec<String>,
    },
    /// List supported platforms
    Platforms,
    /// Resolve a share link to watermark-free media URLs
    Parse(ParseArgs),
    /// Cut a watermark band out of a local image
    Crop(CropArgs),
    /// Browse and edit the history ledger
    #[command(subcommand)]
    History(HistoryCommand),
    /// Save media (URLs, local files or a history entry) to the album
    Save(SaveArgs),
    /// Log in with username and password
    Login {
        username: String,
    },
    /// Create an account
    Register {
        username: String,
    },
    /// Resume the stored session
    AutoLogin,
    /// Forget stored credentials
    Logout,
    /// Show the stored session
    Whoami,
    /// Print a stock unmark.toml with all options documented
    GenConfig,
}

#[derive(Args)]
struct ParseArgs {
    /// Link or share text (read from stdin when omitted)
    text: Vec<String>,

    /// Also save the media to the album
    #[arg(long)]
    save: bool,
}

#[derive(Args)]
struct CropArgs {
    /// Image to process
    input: PathBuf,

    /// Quick-select band: top or bottom
    #[arg(long, conflicts_with_all = ["y", "height"])]
    preset: Option<Preset>,

    /// Band start row
    #[arg(long, requires = "height")]
    y: Option<f64>,

    /// Band height
    #[arg(long, requires = "y")]
    height: Option<f64>,

    /// Region left edge (checked against the image, the cut is always full width)
    #[arg(long)]
    x: Option<f64>,

    /// Region width
    #[arg(long)]
    width: Option<f64>,

    /// Interpret the region in a WIDTHxHEIGHT preview instead of source pixels
    #[arg(long)]
    display: Option<DisplaySize>,

    /// Also save the result to the album
    #[arg(long)]
    save: bool,
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// List entries, newest first
    List,
    /// Show one entry
    Show { id: String },
    /// Delete one entry
    Delete { id: String },
    /// Delete every entry
    Clear,
    /// Mark an entry as saved to the album
    MarkSaved { id: String },
    /// Print the number of entries
    Count,
}

#[derive(Args)]
struct SaveArgs {
    /// URLs or local files
    #[arg(conflicts_with = "entry")]
    sources: Vec<String>,

    /// Save the results of this history entry and mark it saved
    #[arg(long)]
    entry: Option<String>,
}

fn main() -> CliResult {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        if needs_login(err.as_ref()) {
            eprintln!("Not logged in. Run `unmark login <username>` first.");
        }
        return Err(err);
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("UNMARK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("unmark={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn needs_login(err: &(dyn std::error::Error + 'static)) -> bool {
    match err.downcast_ref::<AuthError>() {
        Some(AuthError::NotLoggedIn | AuthError::Api(ApiError::Unauthorized)) => true,
        Some(_) => false,
        None => matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized)),
    }
}

fn run(cli: Cli) -> CliResult {
    // gen-config must work even when the existing file is invalid.
    let config = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        _ => config::load_config(&cli.config)?,
    };
    let store = FileStore::new(&config.storage.data_dir);
    let ledger = Ledger::new(&store);

    match cli.command {
        Command::Identify { text } => {
            let text = text.join(" ");
            let url = platform::extract_url(&text);
            let tag = platform::identify(url.as_deref().unwrap_or(&text));
            output::print_identify(tag, url.as_deref());
        }
        Command::Platforms => {
            output::print_platforms(&platform::supported_platforms());
        }
        Command::Parse(args) => {
            let text = if args.text.is_empty() {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                args.text.join(" ")
            };
            let source = parse::source_from_config(&config.parse, config.api.timeout())?;
            let outcome = parse::parse_share_text(source.as_ref(), &text)?;
            let recorded = ledger.add(outcome.to_new_entry())?;
            output::print_parse_outcome(&outcome, Some(&recorded));

            if args.save {
                let album = open_album(&config)?;
                let saved = save_sources(
                    &album,
                    &recorded.result_urls,
                    recorded.media_type != MediaKind::Video,
                )?;
                output::print_saved(&saved);
                ledger.mark_as_saved(&recorded.id)?;
            }
        }
        Command::Crop(args) => {
            let backend = RustBackend::new();
            let media = SelectedMedia::from_path(&args.input)?;
            // Videos are refused by process_selected before the region is used.
            let region = match media.kind {
                LocalKind::Image => {
                    let dims = backend.identify(&media.path)?;
                    crop_region(&args, dims, &config.crop)?
                }
                LocalKind::Video => RegionInput::Source(Rectangle::default()),
            };
            let result = process_selected(
                &backend,
                &media,
                region,
                &config.crop.effective_output_dir(),
            )?;
            let recorded = ledger.add(result.to_new_entry())?;
            output::print_crop_output(&result, Some(&recorded));

            if args.save {
                let album = open_album(&config)?;
                let saved = album.save_image(&result.path.to_string_lossy())?;
                output::print_saved(&[saved]);
                ledger.mark_as_saved(&recorded.id)?;
            }
        }
        Command::History(cmd) => run_history(&ledger, cmd)?,
        Command::Save(args) => {
            let album = open_album(&config)?;
            match args.entry {
                Some(id) => {
                    let entry = ledger
                        .get(&id)
                        .ok_or_else(|| format!("No history entry {id}"))?;
                    let saved = save_sources(
                        &album,
                        &entry.result_urls,
                        entry.media_type != MediaKind::Video,
                    )?;
                    output::print_saved(&saved);
                    ledger.mark_as_saved(&entry.id)?;
                }
                None => {
                    if args.sources.is_empty() {
                        return Err("Nothing to save: pass URLs, files or --entry".into());
                    }
                    let all_images = !args.sources.iter().any(|s| is_video_name(s));
                    let saved = save_sources(&album, &args.sources, all_images)?;
                    output::print_saved(&saved);
                }
            }
        }
        Command::Login { username } => {
            let password = prompt("Password")?;
            auth::validate_login(&username, &password)?;
            let client = auth_client(&config, &store)?;
            let response = client.login(&username, &password)?;
            if !response.is_success() {
                return Err(format!("Login failed: {}", response.message).into());
            }
            println!("Logged in as {}", username.trim());
        }
        Command::Register { username } => {
            let password = prompt("Password")?;
            let confirm = prompt("Repeat password")?;
            auth::validate_registration(&username, &password, &confirm)?;
            let client = auth_client(&config, &store)?;
            let response = client.register(&username, &password)?;
            if !response.is_success() {
                return Err(format!("Registration failed: {}", response.message).into());
            }
            println!("Registered {}. Run `unmark login {}` to sign in.", username.trim(), username.trim());
        }
        Command::AutoLogin => {
            let client = auth_client(&config, &store)?;
            match client.resume_session()? {
                SessionState::Resumed => println!("Session resumed"),
                SessionState::NoToken => return Err(AuthError::NotLoggedIn.into()),
                SessionState::Refused(message) => {
                    println!("Auto-login refused: {message}");
                    return Err(AuthError::NotLoggedIn.into());
                }
            }
        }
        Command::Logout => {
            let client = auth_client(&config, &store)?;
            if client.logout() {
                println!("Logged out");
            } else {
                return Err("Could not remove stored credentials".into());
            }
        }
        Command::Whoami => {
            let client = auth_client(&config, &store)?;
            let credentials = client.credentials();
            if !credentials.has_token() {
                return Err(AuthError::NotLoggedIn.into());
            }
            let expires = credentials.expires_at().unwrap_or_else(|| "unknown".into());
            let state = if credentials.is_token_expired(chrono::Utc::now()) {
                "expired"
            } else {
                "valid"
            };
            println!("Token {state}, expires {expires}");
        }
        Command::GenConfig => {}
    }

    Ok(())
}

fn run_history(ledger: &Ledger<&FileStore>, cmd: HistoryCommand) -> CliResult {
    let now = chrono::Utc::now();
    match cmd {
        HistoryCommand::List => output::print_history_list(&ledger.list(), now),
        HistoryCommand::Show { id } => {
            let entry = ledger.get(&id).ok_or_else(|| format!("No history entry {id}"))?;
            output::print_history_entry(&entry, now);
        }
        HistoryCommand::Delete { id } => {
            if !ledger.delete(&id) {
                return Err(format!("No history entry {id} was deleted").into());
            }
            println!("Deleted {id}");
        }
        HistoryCommand::Clear => {
            if !ledger.clear() {
                return Err("Could not clear history".into());
            }
            println!("History cleared");
        }
        HistoryCommand::MarkSaved { id } => match ledger.mark_as_saved(&id)? {
            Some(entry) => println!("Marked {} as saved", entry.id),
            None => return Err(format!("No history entry {id}").into()),
        },
        HistoryCommand::Count => println!("{}", ledger.count()),
    }
    Ok(())
}

/// Turn the crop flags into a region.
///
/// `--preset` uses the preview the image would be shown at (or `--display`).
/// `--y/--height` are source pixels unless `--display` is given.
fn crop_region(args: &CropArgs, dims: Dimensions, crop: &CropConfig) -> CliResult<RegionInput> {
    let preview = args.display.unwrap_or_else(|| {
        fit_display_size(dims, crop.max_display_width, crop.max_display_height)
    });
    if let Some(preset) = args.preset {
        return Ok(RegionInput::Preset(preset, preview, crop.preset_height));
    }
    let (Some(y), Some(height)) = (args.y, args.height) else {
        return Err("Choose a region with --preset or --y and --height".into());
    };
    if y < 0.0 || height <= 0.0 || args.x.is_some_and(|x| x < 0.0) {
        return Err("Region coordinates must be non-negative and the height positive".into());
    }
    let x = args.x.unwrap_or(0.0);
    let region = match args.display {
        Some(display) => RegionInput::Display(
            DisplayRect {
                x,
                y,
                width: args.width.unwrap_or(display.width - x),
                height,
            },
            display,
        ),
        None => RegionInput::Source(Rectangle::new(
            x.round() as u32,
            y.round() as u32,
            args.width
                .map_or(dims.width.saturating_sub(x.round() as u32), |w| w.round() as u32),
            height.round() as u32,
        )),
    };
    Ok(region)
}

fn open_album(config: &AppConfig) -> CliResult<Album> {
    let album = Album::new(&config.album.dir, config.api.timeout())?;
    if !album.check_permission() {
        return Err(AlbumError::PermissionDenied(album.dir().to_path_buf()).into());
    }
    Ok(album)
}

/// Save every source. Image sets go through the batch path with one overall
/// progress line; anything else is saved one by one.
fn save_sources(album: &Album, sources: &[String], all_images: bool) -> CliResult<Vec<PathBuf>> {
    if all_images && sources.len() > 1 {
        let saved = album.save_images(sources, &mut progress_line("images"))?;
        eprintln!();
        return Ok(saved);
    }
    let mut saved = Vec::with_capacity(sources.len());
    for source in sources {
        let label = source.rsplit('/').next().unwrap_or(source);
        let mut progress = progress_line(label);
        saved.push(album.save_any(source, &mut progress)?);
        eprintln!();
    }
    Ok(saved)
}

fn progress_line(label: &str) -> impl FnMut(u8) + '_ {
    move |percent| {
        eprint!("\r{}", output::format_progress(label, percent));
        let _ = io::stderr().flush();
    }
}

fn auth_client<'a>(
    config: &AppConfig,
    store: &'a FileStore,
) -> Result<AuthClient<&'a FileStore>, ApiError> {
    let api = ApiClient::new(&config.api.base_url, config.api.timeout(), store)?;
    Ok(AuthClient::new(api))
}

fn prompt(label: &str) -> io::Result<String> {
    eprint!("{label}: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
