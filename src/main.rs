use anyhow::Result;
use clap::{Parser, Subcommand};
use codesearch::format::{generate_code_search_filename, summary_line};
use codesearch::highlight::highlight_for_query;
use codesearch::model::{SearchQuery, total_matches};
use codesearch::search::{FsSearchOptions, FsSearchProvider};
use codesearch::session::{CopyOptions, SearchSession, SessionOptions};
use codesearch::store::{FileStore, terminal_collaborators};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Search code and save the results as .code-search files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a pattern in files
    Search {
        /// Pattern to search for
        pattern: String,

        /// Directory (or file) to search in
        directory: PathBuf,

        /// Treat the pattern as a regular expression
        #[arg(long)]
        regex: bool,

        /// Case sensitive search
        #[arg(long)]
        case_sensitive: bool,

        /// Only match whole words
        #[arg(long)]
        whole_word: bool,

        /// Comma-separated globs of files to include
        #[arg(long)]
        include: Option<String>,

        /// Comma-separated globs of files to exclude
        #[arg(long)]
        exclude: Option<String>,

        /// Ignore gitignore files
        #[arg(long)]
        no_ignore: bool,

        /// Maximum directory traversal depth (0 for unlimited)
        #[arg(long = "max-depth", default_value = "20")]
        max_depth: usize,

        /// Save the results to this .code-search file
        #[arg(long)]
        save: Option<PathBuf>,

        /// Print the session as JSON
        #[arg(long)]
        json: bool,

        /// Show match columns next to line numbers
        #[arg(long)]
        columns: bool,
    },

    /// Display a saved .code-search file
    Show {
        /// The .code-search file to display
        file: PathBuf,

        /// Show every file, including collapsed ones
        #[arg(long)]
        expand_all: bool,

        /// Bracket the matched text in each line
        #[arg(long)]
        mark: bool,

        /// Print the session as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-run a saved search and write the new results back
    Rerun {
        /// The .code-search file to refresh
        file: PathBuf,

        /// Directory to search in
        directory: PathBuf,

        /// Ignore gitignore files
        #[arg(long)]
        no_ignore: bool,
    },

    /// Print the suggested .code-search filename for a pattern
    Filename {
        /// Pattern to derive the filename from
        pattern: String,
    },
}

fn main() -> Result<()> {
    codesearch::telemetry::init()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            pattern,
            directory,
            regex,
            case_sensitive,
            whole_word,
            include,
            exclude,
            no_ignore,
            max_depth,
            save,
            json,
            columns,
        } => {
            let query = SearchQuery::new(pattern)
                .regex(regex)
                .case_sensitive(case_sensitive)
                .whole_word(whole_word)
                .include(include.unwrap_or_default())
                .exclude(exclude.unwrap_or_default());
            let provider = FsSearchProvider::with_options(
                &directory,
                FsSearchOptions {
                    respect_gitignore: !no_ignore,
                    max_depth: if max_depth == 0 { None } else { Some(max_depth) },
                    ..FsSearchOptions::default()
                },
            );

            let store = match &save {
                Some(path) => FileStore::to_file(path),
                None => FileStore::in_directory("."),
            };
            let mut session = SearchSession::new("cli", terminal_collaborators(store));
            session.run_search(&provider, query)?;

            if json {
                println!("{}", serde_json::to_string_pretty(session.state())?);
            } else if session.results().is_empty() {
                println!("No matches found.");
            } else {
                let results = session.results().to_vec();
                println!(
                    "{}\n",
                    summary_line(total_matches(&results), results.len())
                );
                session.copy_all_results(
                    &results,
                    &CopyOptions {
                        strip_prefix: None,
                        include_columns: columns,
                    },
                )?;
            }

            if save.is_some() {
                if let Some(path) = session.save()? {
                    eprintln!("Saved to {}", path.display());
                }
            }
        }

        Commands::Show {
            file,
            expand_all,
            mark,
            json,
        } => {
            let mut session = open_session(&file)?;
            if expand_all {
                session.expand_all();
            }

            if json {
                println!("{}", serde_json::to_string_pretty(session.state())?);
                return Ok(());
            }

            let query = session.query();
            println!("Query: {}", query.pattern);
            println!(
                "{}",
                summary_line(total_matches(session.results()), session.results().len())
            );

            for entry in session.results() {
                println!();
                if !session.is_expanded(&entry.file) {
                    println!("{} ({} matches collapsed)", entry.file, entry.match_count());
                    continue;
                }
                println!("{}", entry.file);
                for m in &entry.matches {
                    if mark {
                        let h = highlight_for_query(m, query);
                        println!("  {}: {}[{}]{}", m.line, h.before, h.highlighted, h.after);
                    } else {
                        println!("  {}: {}", m.line, m.text);
                    }
                }
            }
        }

        Commands::Rerun {
            file,
            directory,
            no_ignore,
        } => {
            let mut session = open_session(&file)?;
            let provider = FsSearchProvider::with_options(
                &directory,
                FsSearchOptions {
                    respect_gitignore: !no_ignore,
                    ..FsSearchOptions::default()
                },
            );

            session.rerun(&provider)?;
            let results = session.results();
            println!("{}", summary_line(total_matches(results), results.len()));

            if let Some(path) = session.save()? {
                eprintln!("Saved to {}", path.display());
            }
        }

        Commands::Filename { pattern } => {
            println!("{}", generate_code_search_filename(&pattern));
        }
    }

    Ok(())
}

fn open_session(file: &Path) -> Result<SearchSession> {
    let session = SearchSession::open(
        "cli",
        file,
        terminal_collaborators(FileStore::to_file(file)),
        SessionOptions::default(),
    )?;
    Ok(session)
}
