/// kc-shred - Secure shredding CLI
///
/// This binary is the composition root:
/// 1. Load configuration (explicit file, $KC_SHRED_CONFIG, or <exe>.config)
/// 2. Build the cleanup manager and install termination hooks
/// 3. Shred a file or directory, or run the wipe on demand
use std::io::Write;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use kc_shred::cleanup::{self, CleanupManager};
use kc_shred::config::load_config;
use kc_shred::security::{ShredOutcome, ShredRequest, Shredder};
use kc_shred::utils::detect_platform;

#[derive(Parser)]
#[command(name = "kc-shred")]
#[command(version)]
#[command(about = "Securely overwrite and delete files, and wipe secrets on exit", long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level (trace|debug|info|warn|error|none)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shred a single file
    File {
        path: PathBuf,

        /// Overwrite passes (1-35); defaults to the configured value
        #[arg(short, long)]
        passes: Option<u32>,

        /// Move the garbled file under this directory instead of deleting it
        #[arg(long)]
        keep_root: Option<PathBuf>,
    },

    /// Shred every file in a directory tree, then remove it
    Dir {
        path: PathBuf,

        /// Overwrite passes (1-35); defaults to the configured value
        #[arg(short, long)]
        passes: Option<u32>,

        /// Move garbled files under this directory, keeping the tree layout
        #[arg(long)]
        keep_root: Option<PathBuf>,
    },

    /// Scrub registered secrets and the clipboard now
    Wipe,
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            exit(1);
        }
    };

    kc_shred::logging::init(cli.log_level.as_deref().unwrap_or(&config.log_level));
    tracing::debug!(platform = detect_platform().name(), pid = std::process::id(), "kc-shred starting");

    let manager = Arc::new(CleanupManager::from_config(&config));
    let exit_guard = match cleanup::install(&manager, config.cleanup.exit_on_panic) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("❌ Failed to install termination hooks: {}", e);
            exit(1);
        }
    };

    let shredder = Shredder::new(config.buffer_size);
    let code = match cli.command {
        Commands::File { path, passes, keep_root } => {
            eprintln!("🔥 Shredding file: {}", path.display());
            let request = request(path, passes.unwrap_or(config.passes), keep_root);
            report(shredder.shred_file(request))
        }
        Commands::Dir { path, passes, keep_root } => {
            eprintln!("🔥 Shredding directory: {}", path.display());
            let request = request(path, passes.unwrap_or(config.passes), keep_root);
            report(shredder.shred_directory(request))
        }
        Commands::Wipe => match manager.wipe() {
            Some(wipe) => {
                eprintln!(
                    "✅ Wipe done: {} secret(s) scrubbed, {} path(s) shredded, clipboard {}",
                    wipe.secrets_scrubbed,
                    wipe.paths_shredded,
                    if wipe.clipboard_cleared { "cleared" } else { "untouched" }
                );
                0
            }
            None => {
                eprintln!("ℹ️  Wipe already ran");
                0
            }
        },
    };

    // runs the exit wipe before exit() skips destructors
    drop(exit_guard);
    exit(code);
}

fn request(path: PathBuf, passes: u32, keep_root: Option<PathBuf>) -> ShredRequest<'static> {
    let request = ShredRequest::new(path).passes(passes).progress(|done, total| {
        eprint!("\r  Pass {}/{}", done, total);
        let _ = std::io::stderr().flush();
        if done == total {
            eprintln!();
        }
    });

    match keep_root {
        Some(root) => request.keep_bytes_in(root),
        None => request,
    }
}

fn report(outcome: ShredOutcome) -> i32 {
    if outcome.non_rotational {
        eprintln!("⚠️  Target looks like SSD/flash storage; overwriting may not reach every copy of the data");
    }

    if outcome.success {
        eprintln!("✅ {}", outcome.detail);
        0
    } else {
        eprintln!("❌ {}", outcome.detail);
        1
    }
}
