use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use quejas::config::{LabelConfig, SubclusterFileConfig};
use quejas::display::{summary::LabelCounts, trends::MonthlyCounts};
use quejas::qj::{
    embeddings::DbscanClusterer,
    labels::{
        self, LabelFallback, LabelMapOptions, PAIN_POINT_COLUMN, apply_labels, build_label_map,
    },
    subcluster::{SUBTOPIC_LABEL_COLUMN, SubclusterOptions, subcluster},
    table::Table,
};

/// pp: A Pain-point Processor
#[derive(Parser)]
#[command(name = "pp")]
#[command(about = "Label clustered review topics and dig into subtopics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach pain-point labels to a table of per-review topic assignments.
    Label {
        /// The clustering run's summary table (topic id + Representation).
        #[arg(short = 't', long)]
        topic_info: PathBuf,

        /// Per-review topic assignments to label.
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the labeled table.
        #[arg(short, long)]
        output: PathBuf,

        /// Label used when a cluster has no usable keywords or a record's
        /// id isn't covered by the map.
        #[arg(long, default_value = "general issues")]
        default_label: String,
    },

    /// Re-cluster selected topics into subtopics, per a TOML run config.
    Subcluster {
        /// Path to the run configuration file.
        #[arg(short, long, env = "PP_SUBCLUSTER_CONFIG")]
        config: PathBuf,
    },

    /// Print label prevalence for an already-labeled table.
    Summary {
        /// The labeled table to summarize.
        #[arg(short, long)]
        input: PathBuf,

        /// The label column to count.
        #[arg(short = 'c', long, default_value = PAIN_POINT_COLUMN)]
        label_column: String,

        /// Also write the counts as a CSV stats table.
        #[arg(long)]
        stats_output: Option<PathBuf>,
    },

    /// Compute monthly per-label counts for an already-labeled table.
    Trends {
        /// The labeled table to bucket by month.
        #[arg(short, long)]
        input: PathBuf,

        /// The label column to count.
        #[arg(short = 'c', long, default_value = PAIN_POINT_COLUMN)]
        label_column: String,

        /// The timestamp column to bucket on.
        #[arg(short = 't', long, default_value = "at")]
        timestamp_column: String,

        /// Where to write the month,label,count table.
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Label {
            topic_info,
            input,
            output,
            default_label,
        } => handle_label(&LabelConfig {
            topic_info_path: topic_info.clone(),
            input_path: input.clone(),
            output_path: output.clone(),
            default_label: default_label.clone(),
        }),
        Commands::Subcluster { config } => handle_subcluster(config),
        Commands::Summary {
            input,
            label_column,
            stats_output,
        } => handle_summary(input, label_column, stats_output.as_deref()),
        Commands::Trends {
            input,
            label_column,
            timestamp_column,
            output,
        } => handle_trends(input, label_column, timestamp_column, output),
    }
}

/// The flat labeling pass: one clustering run's summary table in, one
/// labeled assignments table out.
fn handle_label(config: &LabelConfig) -> Result<()> {
    info!(
        "loading topic info from {}",
        config.topic_info_path.display()
    );
    let topic_info = Table::read_csv(&config.topic_info_path)?;
    let rows = labels::cluster_info_rows(&topic_info)?;

    let map = build_label_map(
        &rows,
        &LabelMapOptions {
            fallback: LabelFallback::Fixed(config.default_label.clone()),
            noise_override: None,
        },
    );
    info!("built labels for {} topics", map.len());
    for id in map.sorted_ids().into_iter().take(10) {
        info!("  topic {id}: {}", map.get(&id).expect("id came from the map"));
    }

    info!(
        "loading per-review topic assignments from {}",
        config.input_path.display()
    );
    let mut table = Table::read_csv(&config.input_path)?;
    apply_labels(&mut table, PAIN_POINT_COLUMN, &map, &config.default_label)?;

    if let Some(parent) = config.output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output dir {}", parent.display()))?;
    }
    table
        .write_csv(&config.output_path)
        .with_context(|| "writing labeled table")?;
    println!(
        "Saved {} labeled reviews to {}",
        table.len(),
        config.output_path.display()
    );
    Ok(())
}

/// The hierarchical pass: re-cluster each configured topic, persist per-topic
/// files, then write the merged table.
fn handle_subcluster(config_path: &Path) -> Result<()> {
    let config = SubclusterFileConfig::load(config_path)?;
    let output_dir = config.resolve_output_dir()?;
    let combined_path = config.resolve_combined_output(&output_dir);

    let table = Table::read_csv(&config.input_path)?;
    info!(
        "loaded {} reviews from {}",
        table.len(),
        config.input_path.display()
    );

    let clusterer = DbscanClusterer::new(
        config.min_cluster_size.try_into()?,
        config.tolerance.try_into()?,
        config.min_doc_freq,
        config.top_n_words,
    );
    let options = SubclusterOptions {
        target_topics: config.target_topic_ids(),
        text_column: config.text_column.clone(),
        fallback_label: config.fallback_label.clone(),
        output_dir,
    };

    let combined = subcluster(&table, &options, &clusterer)?;

    print!(
        "{}",
        LabelCounts::from_column(&combined, SUBTOPIC_LABEL_COLUMN)?
    );

    if let Some(parent) = combined_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output dir {}", parent.display()))?;
    }
    combined
        .write_csv(&combined_path)
        .with_context(|| "writing combined table")?;
    println!(
        "Saved combined file with subtopics to {}",
        combined_path.display()
    );
    Ok(())
}

/// Prevalence counts for a labeled table, optionally persisted as CSV.
fn handle_summary(input: &Path, label_column: &str, stats_output: Option<&Path>) -> Result<()> {
    let table = Table::read_csv(input)?;
    let counts = LabelCounts::from_column(&table, label_column)?;
    print!("{}", counts);

    if let Some(path) = stats_output {
        counts
            .to_table()
            .write_csv(path)
            .with_context(|| "writing stats table")?;
        println!("Saved prevalence stats to {}", path.display());
    }
    Ok(())
}

/// Monthly per-label counts, persisted as a month,label,count table.
fn handle_trends(
    input: &Path,
    label_column: &str,
    timestamp_column: &str,
    output: &Path,
) -> Result<()> {
    let table = Table::read_csv(input)?;
    let counts = MonthlyCounts::from_columns(&table, timestamp_column, label_column)?;
    print!("{}", counts);

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output dir {}", parent.display()))?;
    }
    counts
        .to_table()
        .write_csv(output)
        .with_context(|| "writing trends table")?;
    println!("Saved monthly trends to {}", output.display());
    Ok(())
}
