use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use themepatch_lib::config::InputType;
use themepatch_lib::style::synthesizer::{generate_from_form, FormValues};
use themepatch_lib::{
    color, FileStorage, PersistOutcome, SaveOutcome, StyleUpdate, StylesheetApplicator,
    ThemeConfig, ThemeEditor, ThemeError, DEFAULT_STORAGE_KEY,
};

const THEMEPATCH_INTRO: &str = r#"
      _   _                                 _       _
     | |_| |__   ___ _ __ ___   ___ _ __   __ _| |_ ___| |__
     | __| '_ \ / _ \ '_ ` _ \ / _ \ '_ \ / _` | __/ __| '_ \
     | |_| | | |  __/ | | | | |  __/ |_) | (_| | || (__| | | |
      \__|_| |_|\___|_| |_| |_|\___| .__/ \__,_|\__\___|_| |_|
                                   |_|
    Theme personalization: edit, persist and export custom CSS.
"#;

#[derive(Parser)]
#[command(name = "themepatch")]
#[command(about = "Edit and persist theme CSS overrides for page regions")]
struct Args {
    /// Directory holding persisted stylesheets.
    #[arg(long, env = "THEMEPATCH_STORE_DIR", default_value = ".themepatch")]
    store_dir: PathBuf,

    /// Storage key the synthesized CSS is saved under.
    #[arg(long, env = "THEMEPATCH_KEY", default_value = DEFAULT_STORAGE_KEY)]
    key: String,

    /// Theme configuration JSON; the built-in header/footer theme if omitted.
    #[arg(long, env = "THEMEPATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Skip the banner.
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the persisted CSS.
    Show,

    /// Record edits for one selector and save them.
    Set {
        selector: String,

        /// `property=value` pairs. A value of `unset` reverts the property.
        #[arg(value_name = "PROP=VALUE")]
        edits: Vec<String>,

        /// Revert a property to the page stylesheet.
        #[arg(long = "unset", value_name = "PROP")]
        unset: Vec<String>,

        /// Also record the edits under this grouping selector.
        #[arg(long)]
        group: Option<String>,
    },

    /// Normalize a color and print its ideal text color.
    Color {
        input: String,

        /// Keep an alpha channel as two extra hex digits.
        #[arg(long)]
        alpha: bool,
    },

    /// Write the persisted CSS to a file.
    Export {
        #[arg(short, long, default_value = "theme.css")]
        output: PathBuf,

        #[arg(long)]
        minify: bool,
    },

    /// Remove the persisted CSS.
    Clear,

    /// Render CSS for a JSON file of form values keyed by selector.
    Generate { values: PathBuf },
}

fn load_config(path: Option<&PathBuf>) -> Result<ThemeConfig, ThemeError> {
    let config = match path {
        Some(path) => ThemeConfig::load(path)?,
        None => ThemeConfig::builtin()?,
    };
    Ok(config)
}

fn run(args: Args) -> Result<ExitCode, ThemeError> {
    let storage = FileStorage::new(&args.store_dir);
    let mut applicator = StylesheetApplicator::with_key(storage, args.key.as_str());

    match args.command {
        Command::Show => {
            print!("{}", applicator.load_persisted());
        }
        Command::Set {
            selector,
            edits,
            unset,
            group,
        } => {
            let config = load_config(args.config.as_ref())?;
            let mut editor = ThemeEditor::new(config, applicator);
            editor.startup();

            for edit in &edits {
                let Some((property, value)) = edit.split_once('=') else {
                    log::warn!("ignoring {edit:?}: expected PROP=VALUE");
                    continue;
                };
                let (property, value) = (property.trim(), value.trim());
                let is_color = editor
                    .config()
                    .property(&selector, property)
                    .or_else(|| editor.config().catalog_property(property))
                    .map_or(property.ends_with("color"), |def| {
                        def.input_type == InputType::Color
                    });
                if is_color {
                    if editor
                        .set_color_grouped(&selector, group.as_deref(), property, value)
                        .is_none()
                        && !value.eq_ignore_ascii_case("unset")
                        && !value.eq_ignore_ascii_case("remove")
                    {
                        log::warn!("{value:?} is not a color; {property} left unchanged");
                    }
                } else {
                    let mut update = StyleUpdate::new(&selector, property, value);
                    if let Some(group) = group.as_deref() {
                        update = update.grouped(group);
                    }
                    editor.update_style(update);
                }
            }
            for property in &unset {
                let update = StyleUpdate {
                    group_selector: group.as_deref(),
                    ..StyleUpdate::new(&selector, property, "unset")
                };
                editor.update_style(update);
            }

            match editor.save() {
                SaveOutcome::NoChanges => println!("No changes to save!"),
                SaveOutcome::Saved { css, persisted } => {
                    if persisted == PersistOutcome::SessionOnly {
                        eprintln!("warning: could not write to {}", args.store_dir.display());
                    }
                    print!("{css}");
                }
            }
        }
        Command::Color { input, alpha } => {
            let normalized = if alpha {
                color::normalize_to_hex_alpha(&input)
            } else {
                color::normalize_to_hex(&input)
            };
            match normalized {
                Some(hex) => println!("{hex} (text: {})", color::ideal_text_color(&hex)),
                None => {
                    eprintln!("{input:?} is not a color");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Export { output, minify } => {
            let written = applicator.export(&output, minify)?;
            println!("Exported {}", written.display());
        }
        Command::Clear => {
            applicator.clear();
            println!("Cleared {}", args.key);
        }
        Command::Generate { values } => {
            let config = load_config(args.config.as_ref())?;
            let json = fs::read_to_string(&values).map_err(|source| {
                ThemeError::Config(themepatch_lib::ConfigError::Read {
                    path: values.clone(),
                    source,
                })
            })?;
            let values: FormValues = serde_json::from_str(&json)
                .map_err(|e| ThemeError::Config(e.into()))?;
            print!("{}", generate_from_form(&config, &values));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // parse the args given in terminal
    let args: Args = Args::parse();
    if !args.quiet {
        eprintln!("{}", THEMEPATCH_INTRO);
    }

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
