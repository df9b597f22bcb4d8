use clap::{Parser, Subcommand};
use hymnflow::app_core::{AppCore, SourceView};
use hymnflow::backend::RodioBackend;
use hymnflow::events::Event;
use hymnflow::playback::{MediaBackend, RepeatMode, ScriptedBackend};
use hymnflow::storage::{FileStore, KeyValueStore};
use hymnflow::track::{Catalog, Category, Track};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "hymnflow", about = "Hymn playback and collection engine CLI")]
struct Cli {
    /// Path to the hymn catalog JSON file
    #[arg(long, global = true, default_value = "catalog.json")]
    catalog: PathBuf,
    /// Override the per-user data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show engine status
    Status,
    /// List hymns or collections
    List {
        #[command(subcommand)]
        what: ListCmd,
    },
    /// Play hymns (blocks until playback stops)
    Play {
        /// Start from a specific hymn id
        #[arg(short, long)]
        track: Option<u32>,
        /// Play a category (general, official-service, youth, funeral)
        #[arg(short, long)]
        category: Option<String>,
        /// Play a playlist by id
        #[arg(short, long)]
        playlist: Option<String>,
        /// Play the favorites collection
        #[arg(short, long)]
        favorites: bool,
        /// Shuffle the queue
        #[arg(short, long)]
        shuffle: bool,
        /// Repeat mode: none, one, or all
        #[arg(short, long)]
        repeat: Option<String>,
    },
    /// Toggle a hymn in the favorites set
    Favorite {
        /// Hymn id to toggle
        track: Option<u32>,
        /// Remove all favorites
        #[arg(long)]
        clear: bool,
    },
    /// Playlist management
    Playlist {
        #[command(subcommand)]
        action: PlaylistCmd,
    },
    /// Show recently played hymns
    History,
    /// Engine configuration
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
}

#[derive(Subcommand)]
enum ListCmd {
    /// All hymns in the catalog
    Library,
    /// Available categories
    Categories,
    /// Hymns in one category
    Category {
        /// Category slug (general, official-service, youth, funeral)
        slug: String,
    },
    /// Favorited hymns in the order they were added
    Favorites,
    /// Recently played hymns, newest first
    Recent,
    /// Hymns in a playlist
    Playlist { id: String },
}

#[derive(Subcommand)]
enum PlaylistCmd {
    /// Create a new playlist
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long, default_value = "#6366f1")]
        color: String,
        #[arg(long, default_value = "list")]
        icon: String,
    },
    /// List all playlists
    List,
    /// Delete a playlist
    Delete { id: String },
    /// Edit a playlist's name or appearance
    Edit {
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Add a hymn to a playlist
    Add { id: String, track: u32 },
    /// Remove a hymn from a playlist
    Remove { id: String, track: u32 },
    /// Show the hymns in a playlist
    Show { id: String },
    /// Remove every hymn from a playlist
    Clear { id: String },
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Enable or disable auto-play of the next hymn (on/off)
    Autoplay { state: String },
    /// Set the playback volume (0.0 to 1.0)
    Volume { value: f32 },
    /// Show current configuration
    Show,
}

fn main() {
    colog::init();
    let cli = Cli::parse();
    let catalog = load_catalog(&cli.catalog);
    let media_root = cli
        .catalog
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Status => {
            let core = open_core(catalog, cli.data_dir.as_deref(), None);
            let settings = core.settings();
            println!("hymnflow engine v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "Hymns: {} | Favorites: {} | Playlists: {} | Auto-play: {} | Volume: {:.0}%",
                core.catalog().len(),
                core.collections.favorites().len(),
                core.collections.user_playlists().len(),
                if settings.auto_play_next { "on" } else { "off" },
                settings.volume * 100.0
            );
        }
        Commands::List { what } => {
            let core = open_core(catalog, cli.data_dir.as_deref(), None);
            match what {
                ListCmd::Library => print_tracks(&core, &SourceView::Library),
                ListCmd::Categories => {
                    for cat in Category::ALL {
                        let count = core.catalog().by_category(cat).len();
                        println!("{:<18} {} hymn(s) — {}", cat.name(), count, cat.description());
                    }
                }
                ListCmd::Category { slug } => {
                    let cat = match Category::from_slug(&slug) {
                        Some(c) => c,
                        None => {
                            eprintln!(
                                "Error: unknown category '{}'. Use general, official-service, youth, or funeral.",
                                slug
                            );
                            std::process::exit(1);
                        }
                    };
                    print_tracks(&core, &SourceView::Category(cat));
                }
                ListCmd::Favorites => print_tracks(&core, &SourceView::Favorites),
                ListCmd::Recent => {
                    let ids = core.collections.recently_played_ids();
                    if ids.is_empty() {
                        println!("No playback history yet.");
                        return;
                    }
                    for (i, &id) in ids.iter().enumerate() {
                        if let Some(t) = core.catalog().get(id) {
                            println!("{:<3} [{}] {}", i + 1, t.number, t.title);
                        }
                    }
                }
                ListCmd::Playlist { id } => print_tracks(&core, &SourceView::Playlist(id)),
            }
        }
        Commands::Play {
            track,
            category,
            playlist,
            favorites,
            shuffle,
            repeat,
        } => {
            let backend = match RodioBackend::new(media_root) {
                Ok(b) => b,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            let mut core = open_core(catalog, cli.data_dir.as_deref(), Some(Box::new(backend)));

            if let Some(mode) = repeat {
                core.set_repeat_mode(parse_repeat_mode(&mode));
            }
            if shuffle {
                core.toggle_shuffle();
            }

            let result = if let Some(id) = track {
                core.play_track_id(id)
            } else if let Some(slug) = category {
                match Category::from_slug(&slug) {
                    Some(cat) => core.play_source(&SourceView::Category(cat), shuffle),
                    None => {
                        eprintln!("Error: unknown category '{}'", slug);
                        std::process::exit(1);
                    }
                }
            } else if let Some(id) = playlist {
                core.play_source(&SourceView::Playlist(id), shuffle)
            } else if favorites {
                core.play_source(&SourceView::Favorites, shuffle)
            } else {
                core.play_source(&SourceView::Library, shuffle)
            };
            if let Err(e) = result {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
            run_playback_loop(&mut core);
        }
        Commands::Favorite { track, clear } => {
            let mut core = open_core(catalog, cli.data_dir.as_deref(), None);
            if clear {
                let removed = core.clear_favorites();
                println!("Removed {} favorite(s).", removed);
                return;
            }
            let Some(track) = track else {
                eprintln!("Error: pass a hymn id or --clear");
                std::process::exit(1);
            };
            match core.toggle_favorite(track) {
                Ok(true) => println!("Hymn {} added to favorites.", track),
                Ok(false) => println!("Hymn {} removed from favorites.", track),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Playlist { action } => {
            let mut core = open_core(catalog, cli.data_dir.as_deref(), None);
            match action {
                PlaylistCmd::Create {
                    name,
                    description,
                    color,
                    icon,
                } => match core.create_playlist(&name, &description, &color, &icon) {
                    Ok(p) => println!("Created playlist '{}' (id: {})", p.name, p.id),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                },
                PlaylistCmd::List => {
                    for p in core.get_playlists() {
                        let marker = if p.is_system { " (system)" } else { "" };
                        println!("{:<36} {} — {} hymn(s){}", p.id, p.name, p.track_count, marker);
                    }
                }
                PlaylistCmd::Delete { id } => match core.delete_playlist(&id) {
                    Ok(()) => println!("Deleted playlist '{}'.", id),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                },
                PlaylistCmd::Edit {
                    id,
                    name,
                    description,
                    color,
                    icon,
                } => match core.update_playlist(
                    &id,
                    name.as_deref(),
                    description.as_deref(),
                    color.as_deref(),
                    icon.as_deref(),
                ) {
                    Ok(()) => println!("Updated playlist '{}'.", id),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                },
                PlaylistCmd::Add { id, track } => match core.add_track_to_playlist(&id, track) {
                    Ok(hymnflow::collection::AddOutcome::Added) => {
                        println!("Added hymn {} to '{}'.", track, id)
                    }
                    Ok(hymnflow::collection::AddOutcome::AlreadyPresent) => {
                        println!("Hymn {} is already in '{}'.", track, id)
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                },
                PlaylistCmd::Remove { id, track } => {
                    match core.remove_track_from_playlist(&id, track) {
                        Ok(()) => println!("Removed hymn {} from '{}'.", track, id),
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            std::process::exit(1);
                        }
                    }
                }
                PlaylistCmd::Show { id } => print_tracks(&core, &SourceView::Playlist(id)),
                PlaylistCmd::Clear { id } => match core.clear_playlist(&id) {
                    Ok(n) => println!("Removed {} hymn(s) from '{}'.", n, id),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                },
            }
        }
        Commands::History => {
            let core = open_core(catalog, cli.data_dir.as_deref(), None);
            let ids = core.collections.recently_played_ids();
            if ids.is_empty() {
                println!("No playback history yet.");
                return;
            }
            println!("Recently played ({} hymn(s), newest first):", ids.len());
            for &id in ids {
                if let Some(t) = core.catalog().get(id) {
                    println!("  [{}] {}", t.number, t.title);
                }
            }
        }
        Commands::Config { action } => {
            let mut core = open_core(catalog, cli.data_dir.as_deref(), None);
            match action {
                ConfigCmd::Autoplay { state } => {
                    let enabled = match state.as_str() {
                        "on" => true,
                        "off" => false,
                        other => {
                            eprintln!("Error: expected 'on' or 'off', got '{}'", other);
                            std::process::exit(1);
                        }
                    };
                    core.set_auto_play_next(enabled);
                    println!("Auto-play {}.", if enabled { "enabled" } else { "disabled" });
                }
                ConfigCmd::Volume { value } => {
                    if !(0.0..=1.0).contains(&value) {
                        eprintln!("Error: volume must be between 0.0 and 1.0");
                        std::process::exit(1);
                    }
                    core.set_volume(value);
                    println!("Volume set to {:.0}%.", value * 100.0);
                }
                ConfigCmd::Show => {
                    let settings = core.settings();
                    println!(
                        "Auto-play next: {}",
                        if settings.auto_play_next { "on" } else { "off" }
                    );
                    println!("Volume: {:.0}%", settings.volume * 100.0);
                    println!(
                        "Repeat: {:?} | Shuffle: {}",
                        core.playback.session.repeat_mode,
                        if core.playback.session.shuffle_enabled {
                            "on"
                        } else {
                            "off"
                        }
                    );
                }
            }
        }
    }
}

/// Read and filter the catalog file. Exits on a missing or malformed file.
fn load_catalog(path: &Path) -> Catalog {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: cannot read catalog '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    };
    let tracks: Vec<Track> = match serde_json::from_slice(&bytes) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: malformed catalog '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    };
    Catalog::new(tracks)
}

/// Build the core over the per-user file store. Commands that never touch
/// audio get a scripted backend so no output device is opened.
fn open_core(
    catalog: Catalog,
    data_dir: Option<&Path>,
    backend: Option<Box<dyn MediaBackend>>,
) -> AppCore {
    let store = match data_dir {
        Some(dir) => FileStore::open(dir),
        None => FileStore::open_default(),
    };
    let store: Box<dyn KeyValueStore> = match store {
        Ok(s) => Box::new(s),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let backend = backend.unwrap_or_else(|| Box::new(ScriptedBackend::new()));
    AppCore::new(catalog, store, backend)
}

fn parse_repeat_mode(s: &str) -> RepeatMode {
    match s {
        "none" => RepeatMode::None,
        "one" => RepeatMode::One,
        "all" => RepeatMode::All,
        other => {
            eprintln!("Error: unknown repeat mode '{}'. Use none, one, or all.", other);
            std::process::exit(1);
        }
    }
}

/// Tick the engine until playback stops, echoing track changes and
/// failures as they happen.
fn run_playback_loop(core: &mut AppCore) {
    core.drain_events();
    if let Some(title) = core.get_transport().title {
        println!("Now playing: {}", title);
    }
    loop {
        std::thread::sleep(Duration::from_millis(200));
        core.tick();
        for event in core.drain_events() {
            match event {
                Event::TrackChanged { track_id: Some(id) } => {
                    if let Some(t) = core.catalog().get(id) {
                        println!("Now playing: [{}] {} [{}]", t.number, t.title, t.duration_display());
                    }
                }
                Event::PlaybackFailed { track_id, reason } => {
                    eprintln!("Playback error on hymn {}: {}", track_id, reason);
                }
                _ => {}
            }
        }
        if !core.get_transport().is_playing {
            break;
        }
    }
    println!("Playback finished.");
}

fn print_tracks(core: &AppCore, view: &SourceView) {
    let tracks = match core.list_tracks(view) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if tracks.is_empty() {
        println!("No hymns to show.");
        return;
    }
    println!("{:<5} {:<6} {:<40} {:>6} {}", "Id", "No.", "Title", "Dur", "Fav");
    println!("{}", "-".repeat(64));
    for t in tracks {
        println!(
            "{:<5} {:<6} {:<40} {:>6} {}",
            t.id,
            t.number,
            truncate(&t.title, 39),
            t.duration_display,
            if t.is_favorite { "*" } else { "" }
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{}…", cut)
    } else {
        s.to_string()
    }
}
