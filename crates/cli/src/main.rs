use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use data_loader::{Dataset, LoadOptions, MovieId, UserId, parser};
use models::{
    ArtifactSet, BuildConfig, EmbeddingBuilder, FactorModelBuilder, FeatureSource, genre_features,
    tag_features,
};
use recommender::{Recommendation, ServingContext};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// ReelRecs - Movie Recommendation Engine
#[derive(Parser)]
#[command(name = "reel-recs")]
#[command(about = "Content-similarity and latent-factor movie recommendations", long_about = None)]
struct Cli {
    /// Path to MovieLens dataset directory
    #[arg(short, long, global = true, default_value = "data/ml-latest-small")]
    data_dir: PathBuf,

    /// Directory holding the built artifacts
    #[arg(short, long, global = true, default_value = "artifacts")]
    artifacts_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Features {
    Genres,
    Tags,
}

impl From<Features> for FeatureSource {
    fn from(features: Features) -> Self {
        match features {
            Features::Genres => FeatureSource::Genres,
            Features::Tags => FeatureSource::Tags,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the catalog, embeddings and factor model and write the artifacts
    Build {
        /// JSON build config; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Outside director/cast metadata (title,year,director,cast)
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Features to embed
        #[arg(long, value_enum)]
        features: Option<Features>,

        #[arg(long)]
        embedding_rank: Option<usize>,

        #[arg(long)]
        factor_rank: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Get movies similar to a given title
    Recommend {
        /// Exact movie title, e.g. "Toy Story (1995)" (case-insensitive)
        #[arg(long)]
        title: String,

        /// Number of recommendations to return
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Predict a user's rating of a movie
    Predict {
        #[arg(long)]
        user_id: UserId,

        #[arg(long)]
        movie_id: MovieId,
    },

    /// Compute the RMSE of the factor model against truth ratings
    Evaluate {
        /// Ratings CSV to score against (default: <data-dir>/ratings.csv)
        #[arg(long)]
        ratings: Option<PathBuf>,
    },

    /// Search for movies by title
    Search {
        /// Movie title to search for (case-insensitive substring match)
        #[arg(long)]
        title: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            config,
            metadata,
            features,
            embedding_rank,
            factor_rank,
            seed,
        } => {
            let mut build_config = match config {
                Some(path) => BuildConfig::from_file(&path)
                    .with_context(|| format!("Failed to read build config {}", path.display()))?,
                None => BuildConfig::default(),
            };
            if let Some(features) = features {
                build_config.feature_source = features.into();
            }
            if let Some(rank) = embedding_rank {
                build_config.embedding_rank = rank;
            }
            if let Some(rank) = factor_rank {
                build_config.factor_rank = rank;
            }
            if let Some(seed) = seed {
                build_config.seed = seed;
            }
            let options = LoadOptions {
                metadata,
                with_tags: build_config.feature_source == FeatureSource::Tags,
            };
            let (data_dir, artifacts_dir) = (cli.data_dir, cli.artifacts_dir);
            tokio::task::spawn_blocking(move || {
                handle_build(&data_dir, &artifacts_dir, &options, &build_config)
            })
            .await??
        }
        Commands::Recommend { title, limit } => {
            handle_recommend(&load_context(&cli.artifacts_dir)?, &title, limit)?
        }
        Commands::Predict { user_id, movie_id } => {
            handle_predict(&load_context(&cli.artifacts_dir)?, user_id, movie_id)?
        }
        Commands::Evaluate { ratings } => {
            let ratings = ratings.unwrap_or_else(|| cli.data_dir.join("ratings.csv"));
            let context = load_context(&cli.artifacts_dir)?;
            tokio::task::spawn_blocking(move || handle_evaluate(&context, &ratings)).await??
        }
        Commands::Search { title } => handle_search(&load_context(&cli.artifacts_dir)?, &title),
    }

    Ok(())
}

fn load_context(artifacts_dir: &Path) -> Result<ServingContext> {
    let start = Instant::now();
    let context = ServingContext::load(artifacts_dir).with_context(|| {
        format!(
            "Failed to load artifacts from {} (run `reel-recs build` first)",
            artifacts_dir.display()
        )
    })?;
    info!("Loaded artifacts in {:?}", start.elapsed());
    Ok(context)
}

/// Handle the 'build' command
fn handle_build(
    data_dir: &Path,
    artifacts_dir: &Path,
    options: &LoadOptions,
    config: &BuildConfig,
) -> Result<()> {
    println!("Loading MovieLens dataset from {}...", data_dir.display());
    let start = Instant::now();
    let dataset = Dataset::load_from_dir(data_dir, options)
        .context("Failed to load MovieLens dataset")?;
    println!(
        "{} Loaded {} movies and {} ratings in {:?}",
        "✓".green(),
        dataset.catalog.len(),
        dataset.interactions.len(),
        start.elapsed()
    );

    let features = match config.feature_source {
        FeatureSource::Genres => genre_features(&dataset.catalog),
        FeatureSource::Tags => {
            let genome = dataset
                .tags
                .as_ref()
                .ok_or_else(|| anyhow!("Tag features requested but no tag genome was loaded"))?;
            tag_features(&dataset.catalog, genome)
        }
    };

    let start = Instant::now();
    let embeddings = EmbeddingBuilder::from_config(config)
        .build(&dataset.catalog, &features)
        .context("Failed to build item embeddings")?;
    let factors = FactorModelBuilder::from_config(config)
        .build(&dataset.interactions)
        .context("Failed to build factor model")?;
    println!(
        "{} Built {}-dim {} embeddings and a rank-{} factor model in {:?}",
        "✓".green(),
        embeddings.dim(),
        config.feature_source,
        factors.rank(),
        start.elapsed()
    );

    let artifacts = ArtifactSet::new(dataset.catalog, embeddings, Some(factors))?;
    artifacts
        .save(artifacts_dir, config)
        .with_context(|| format!("Failed to write artifacts to {}", artifacts_dir.display()))?;
    println!(
        "{} Wrote artifacts to {}",
        "✓".green(),
        artifacts_dir.display()
    );
    Ok(())
}

/// Handle the 'recommend' command
fn handle_recommend(context: &ServingContext, title: &str, limit: usize) -> Result<()> {
    let recommendations = context
        .recommend(title, limit)
        .with_context(|| format!("No recommendations for '{}' (try `reel-recs search`)", title))?;
    print_recommendations(title, &recommendations);
    Ok(())
}

/// Handle the 'predict' command
fn handle_predict(context: &ServingContext, user_id: UserId, movie_id: MovieId) -> Result<()> {
    let prediction = context.predict(user_id, movie_id)?;
    let title = context
        .catalog()
        .get_by_id(movie_id)
        .map(|item| item.title.as_str())
        .unwrap_or("?");
    println!(
        "User {} -> {} ({}): {}",
        user_id.to_string().bold(),
        title,
        movie_id,
        format!("{:.3}", prediction).green()
    );
    Ok(())
}

/// Handle the 'evaluate' command
fn handle_evaluate(context: &ServingContext, ratings: &Path) -> Result<()> {
    let truth = parser::parse_ratings(ratings)
        .with_context(|| format!("Failed to read truth ratings {}", ratings.display()))?;
    let report = context.evaluate(&truth)?;

    println!("{}", "Evaluation:".bold().blue());
    println!("{}RMSE: {}", "• ".green(), format!("{:.4}", report.rmse).bold());
    println!("{}Scored records: {}", "• ".cyan(), report.scored);
    println!("{}Skipped (unmapped): {}", "• ".cyan(), report.skipped);
    Ok(())
}

/// Handle the 'search' command
fn handle_search(context: &ServingContext, title: &str) {
    let matches = context.catalog().search(title);
    println!("{}", format!("Search results for '{}':", title).bold().blue());
    if matches.is_empty() {
        println!("  (no matches)");
    }
    for item in matches.iter().take(20) {
        println!("{}: {} [{}]", item.id, item.title, item.genre_string());
    }
    if matches.len() > 20 {
        println!("  ... and {} more", matches.len() - 20);
    }
}

fn print_recommendations(title: &str, recommendations: &[Recommendation]) {
    println!("{}", format!("Movies similar to '{}':", title).bold().blue());
    for (i, rec) in recommendations.iter().enumerate() {
        println!(
            "{}. {} [{}] - Score: {:.4}",
            (i + 1).to_string().green(),
            rec.title,
            rec.genres,
            rec.score
        );
        if let Some(director) = &rec.director {
            println!("   Director: {}", director);
        }
        if let Some(cast) = &rec.cast {
            println!("   Cast: {}", cast);
        }
    }
}
