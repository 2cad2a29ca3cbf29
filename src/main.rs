//! Mushaf query command line.
//!
//! Loads a corpus (SQLite or JSON), builds a query session from defaults, an optional JSON
//! config file and command-line overrides, and runs one query.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use mushaf_query::db::{load_corpus, load_numerology, save_numerology};
use mushaf_query::models::{
    CorpusSource, Hit, Initialization, PartitionKind, Prostration, RevelationPlace, Scope,
    SessionParams, Unit, VerseRef,
};
use mushaf_query::number_query::{Field, Multiplicity, NumberQuery, NumberScope, Test};
use mushaf_query::numerology::{LetterOrder, NumerologySystem, ValueSequence};
use mushaf_query::output::{
    print_hits, print_pairs, print_sentences, print_stats, write_csv_file, write_json_file,
};
use mushaf_query::pattern::{TextLocation, Wordness};
use mushaf_query::session::QuerySession;
use mushaf_query::similarity::SimilarityMethod;
use mushaf_query::simplify::{DiacriticSimplifier, TextMode};
use mushaf_query::text_search::TextQuery;
use mushaf_query::word_search::{Grouping, WordQuery};

#[derive(Parser)]
#[command(name = "mushaf-query")]
#[command(about = "Text, root, number and similarity queries over a scripture corpus")]
#[command(version)]
struct Cli {
    /// Corpus database (.db) or JSON corpus source (.json)
    #[arg(long, global = true, default_value = "corpus.db")]
    corpus: PathBuf,

    /// JSON file with session parameters
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    // === Overrides of SessionParams ===
    // Option<T> so an unset flag keeps the config or default value

    /// Text mode: original, simplified or simplified29 [default: simplified29]
    #[arg(long, global = true)]
    text_mode: Option<TextMode>,

    /// Match diacritics when searching original text [default: false]
    #[arg(long, global = true, action = clap::ArgAction::Set)]
    with_diacritics: Option<bool>,

    /// Active numerology system [default: Simplified29_Alphabet_Primes]
    #[arg(long, global = true)]
    system: Option<String>,

    /// Longest window tried by range queries [default: 29]
    #[arg(long, global = true)]
    max_range_length: Option<usize>,

    /// Similarity threshold between 0 and 1 [default: 0.66]
    #[arg(long, global = true)]
    threshold: Option<f32>,

    /// Restrict the query to these chapters (1-based numbers) via the selection scope
    #[arg(long, global = true, value_delimiter = ',')]
    chapters: Vec<usize>,

    /// Output file (format from --format)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Print at most N results to the console
    #[arg(long, global = true)]
    limit: Option<usize>,

    /// Suppress progress output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for query results
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TagKind {
    Prostration,
    Revelation,
    Initialization,
}

#[derive(Subcommand)]
enum Commands {
    /// Show corpus statistics
    Stats,

    /// Search a text pattern
    Text {
        text: String,

        /// verse, word, chapter, page, station, part, group, half, quarter or bowing
        #[arg(long, default_value = "verse")]
        unit: Unit,

        /// Where in the verse the match sits: any, start, middle, end
        #[arg(long, default_value = "any")]
        in_verse: TextLocation,

        /// Where in the word the match sits: any, start, middle, end
        #[arg(long, default_value = "any")]
        in_word: TextLocation,

        /// any, part-of-word or whole-word
        #[arg(long, default_value = "any")]
        wordness: Wordness,

        /// none, any, a count, or a criterion such as `%2`
        #[arg(long, default_value = "any")]
        multiplicity: Multiplicity,
    },

    /// Boolean word search; prefix terms with + (required) or - (excluded)
    Words {
        text: String,

        #[arg(long, default_value = "verse")]
        unit: Unit,

        #[arg(long, default_value = "whole-word")]
        wordness: Wordness,

        /// How unsigned terms combine: or, and
        #[arg(long, default_value = "or")]
        grouping: Grouping,
    },

    /// Search words by root
    Root {
        text: String,

        #[arg(long, default_value = "verse")]
        unit: Unit,

        #[arg(long, default_value = "any")]
        multiplicity: Multiplicity,
    },

    /// Number query, e.g. `--where words=7 --where value:prime`
    Numbers {
        #[arg(long, default_value = "verse")]
        unit: Unit,

        /// Criteria as FIELD:TEST or FIELD=N (fields: number, units, chapters, verses, words,
        /// letters, unique, value, frequency, occurrence)
        #[arg(long = "where", required = true)]
        criteria: Vec<String>,

        /// Ordinal scope of the number field: number, chapter, verse, word
        #[arg(long, default_value = "number")]
        number_scope: NumberScope,

        /// Search runs of consecutive units instead of single units
        #[arg(long)]
        range: bool,
    },

    /// Segment verses into sentences by pause marks
    Sentences,

    /// Verses similar to a reference verse, or all similar pairs
    Similar {
        /// Reference verse as CHAPTER:VERSE; omit to list all similar pairs
        verse: Option<String>,

        /// text, words, first-word, last-word, first-half, last-half
        #[arg(long, default_value = "text")]
        method: SimilarityMethod,
    },

    /// Verses or partitions carrying a tag
    Tags {
        #[arg(value_enum)]
        kind: TagKind,

        /// obligatory/recommended, makkah/madinah or key/part-of-key; empty means any
        value: Option<String>,

        #[arg(long, default_value = "verse")]
        unit: Unit,
    },

    /// List numerology systems or synthesize a new one
    System {
        /// Letter order of a synthesized system
        #[arg(long)]
        order: Option<LetterOrder>,

        /// Value sequence of a synthesized system
        #[arg(long)]
        sequence: Option<ValueSequence>,

        /// Load a system from a JSON file
        #[arg(long)]
        load: Option<PathBuf>,

        /// Store the new system in the corpus database
        #[arg(long)]
        save: bool,
    },
}

fn load_source(path: &Path) -> Result<CorpusSource, Box<dyn std::error::Error>> {
    if path.extension().is_some_and(|e| e == "json") {
        let text = std::fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&text)?);
    }
    Ok(load_corpus(path)?)
}

fn parse_reference(text: &str) -> Result<VerseRef, String> {
    let (chapter, verse) = text
        .split_once(':')
        .ok_or_else(|| format!("expected CHAPTER:VERSE, got {}", text))?;
    Ok(VerseRef {
        chapter: chapter.trim().parse().map_err(|_| format!("bad chapter in {}", text))?,
        verse: verse.trim().parse().map_err(|_| format!("bad verse in {}", text))?,
    })
}

/// `words=7`, `words:>7` or `value:prime`
fn parse_criterion(text: &str) -> Result<(Field, Test), String> {
    let split = text
        .find([':', '=', '<', '>', '!', '%'])
        .ok_or_else(|| format!("expected FIELD:TEST, got {}", text))?;
    let field: Field = text[..split].parse()?;
    let rest = text[split..].strip_prefix(':').unwrap_or(&text[split..]);
    Ok((field, rest.parse()?))
}

fn emit(session: &QuerySession, hits: &[Hit], cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &cli.output {
        match cli.format {
            OutputFormat::Json => write_json_file(hits, path)?,
            OutputFormat::Csv => write_csv_file(session.book(), hits, path)?,
        }
        if !cli.quiet {
            eprintln!("Output: {}", path.display());
        }
    }
    print_hits(session.book(), hits, cli.limit);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mushaf_query=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Defaults, then the config file, then explicit flags
    let base = match &cli.config {
        Some(path) => SessionParams::from_json_file(path)?,
        None => SessionParams::default(),
    };
    let params = SessionParams {
        text_mode: cli.text_mode.unwrap_or(base.text_mode),
        with_diacritics: cli.with_diacritics.unwrap_or(base.with_diacritics),
        numerology_system: cli.system.clone().unwrap_or(base.numerology_system),
        max_range_length: cli.max_range_length.unwrap_or(base.max_range_length),
        similarity_threshold: cli.threshold.unwrap_or(base.similarity_threshold),
    };

    let source = load_source(&cli.corpus)?;
    let mut session = QuerySession::from_source(&source, Arc::new(DiacriticSimplifier), params)?;
    if cli.corpus.extension().is_some_and(|e| e == "db") {
        session = session.with_registered(load_numerology(&cli.corpus)?);
    }

    let scope = if cli.chapters.is_empty() {
        Scope::Book
    } else {
        let chapters = cli.chapters.iter().filter_map(|n| n.checked_sub(1));
        session = session.with_selected_partitions(PartitionKind::Chapter, chapters);
        Scope::Selection
    };

    match &cli.command {
        Commands::Stats => {
            print_stats(&session.stats());
            println!();
            println!("Numerology systems:");
            for name in session.registry().names() {
                println!("  {}", name);
            }
        }

        Commands::Text {
            text,
            unit,
            in_verse,
            in_word,
            wordness,
            multiplicity,
        } => {
            let query = TextQuery::new(text.as_str())
                .located(*in_verse, *in_word)
                .wordness(*wordness)
                .multiplicity(*multiplicity);
            let hits = session.find_text(&query, *unit, scope)?;
            emit(&session, &hits, &cli)?;
        }

        Commands::Words {
            text,
            unit,
            wordness,
            grouping,
        } => {
            let query = WordQuery::new(text.as_str())
                .wordness(*wordness)
                .grouping(*grouping);
            let hits = session.find_words(&query, *unit, scope)?;
            emit(&session, &hits, &cli)?;
        }

        Commands::Root {
            text,
            unit,
            multiplicity,
        } => {
            let hits = session.find_root(text, *unit, scope, *multiplicity)?;
            emit(&session, &hits, &cli)?;
        }

        Commands::Numbers {
            unit,
            criteria,
            number_scope,
            range,
        } => {
            let mut query = NumberQuery::new().in_scope(*number_scope);
            for criterion in criteria {
                let (field, test) = parse_criterion(criterion)?;
                query = query.with(field, test);
            }
            let hits = if *range {
                session.find_ranges(&query, *unit, scope, !cli.quiet)?
            } else {
                session.find_numbers(&query, *unit, scope)?
            };
            emit(&session, &hits, &cli)?;
        }

        Commands::Sentences => {
            let sentences = session.find_sentences(scope)?;
            if let Some(path) = &cli.output {
                write_json_file(&sentences, path)?;
            }
            print_sentences(session.book(), &sentences, cli.limit);
        }

        Commands::Similar { verse, method } => match verse {
            Some(reference) => {
                let reference = parse_reference(reference)?;
                let Some(index) = session.book().verse_index(reference) else {
                    return Err(format!("no verse {}:{}", reference.chapter, reference.verse).into());
                };
                let hits = session.find_similar(index, *method, scope);
                emit(&session, &hits, &cli)?;
            }
            None => {
                let pairs = session.find_similar_pairs(*method, scope);
                if let Some(path) = &cli.output {
                    write_json_file(&pairs, path)?;
                }
                print_pairs(session.book(), &pairs, cli.limit);
            }
        },

        Commands::Tags { kind, value, unit } => {
            let value = value.as_deref().filter(|v| !v.trim().is_empty() && *v != "any");
            let hits = match kind {
                TagKind::Prostration => {
                    let kind = value.map(str::parse::<Prostration>).transpose()?;
                    session.find_prostrations(kind, *unit, scope)?
                }
                TagKind::Revelation => {
                    let place = value
                        .ok_or("revelation search needs makkah or madinah")?
                        .parse::<RevelationPlace>()?;
                    session.find_revelation(place, *unit, scope)?
                }
                TagKind::Initialization => {
                    let kind = value.map(str::parse::<Initialization>).transpose()?;
                    session.find_initialized(kind, *unit, scope)?
                }
            };
            emit(&session, &hits, &cli)?;
        }

        Commands::System {
            order,
            sequence,
            load,
            save,
        } => {
            let system = match (load, order, sequence) {
                (Some(path), _, _) => {
                    let text = std::fs::read_to_string(path)?;
                    Some(serde_json::from_str::<NumerologySystem>(&text)?.reindexed())
                }
                (None, Some(order), Some(sequence)) => {
                    let book = session.book();
                    let text = book.letter_text(0..book.letters.len());
                    Some(NumerologySystem::synthesize(book.mode, &text, *order, *sequence))
                }
                (None, None, None) => None,
                _ => return Err("synthesizing a system needs both --order and --sequence".into()),
            };

            match system {
                Some(system) => {
                    if *save && !save_numerology(&cli.corpus, &system) && !cli.quiet {
                        eprintln!("Warning: system kept in memory only");
                    }
                    let session = session.with_system(system);
                    if let Some(active) = session.system() {
                        println!("=== {} ===", active.name);
                        for (letter, value) in active.entries() {
                            println!("  {} {}", letter, value);
                        }
                    }
                }
                None => {
                    for name in session.registry().names() {
                        let marker = if name == session.params().numerology_system { "*" } else { " " };
                        println!("{} {}", marker, name);
                    }
                }
            }
        }
    }

    Ok(())
}
