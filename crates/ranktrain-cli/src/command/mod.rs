use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use ranktrain_data::Dataset;
use ranktrain_training::{TraceEntry, TrainingData};

use self::{
    coordinate_ascent::CoordinateAscentArg, evaluate::EvaluateArg,
    train_random_forest::TrainRandomForestArg,
};

mod coordinate_ascent;
mod evaluate;
mod train_random_forest;

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Learning-to-rank trainers and evaluator")]
struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Train a linear model by coordinate ascent
    #[command(name = "coordinate_ascent")]
    CoordinateAscent(#[clap(flatten)] CoordinateAscentArg),
    /// Train a random forest of regression trees
    #[command(name = "train_random_forest")]
    TrainRandomForest(#[clap(flatten)] TrainRandomForestArg),
    /// Score a dataset with a saved model
    Evaluate(#[clap(flatten)] EvaluateArg),
}

pub fn run() -> anyhow::Result<()> {
    let CommandArgs { mode } = CommandArgs::parse();
    match mode {
        Mode::CoordinateAscent(arg) => coordinate_ascent::run(&arg)?,
        Mode::TrainRandomForest(arg) => train_random_forest::run(&arg)?,
        Mode::Evaluate(arg) => evaluate::run(&arg)?,
    }
    Ok(())
}

/// Inputs shared by the training commands.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainInputArg {
    /// Training data in SVMlight/LETOR format
    train_file: PathBuf,
    /// Test data, reported after every step
    #[arg(long)]
    test: Option<PathBuf>,
    /// Validation data, used to pick the best restart
    #[arg(long)]
    validate: Option<PathBuf>,
    /// File with `<id> <name>` lines naming the features
    #[arg(long = "feature_names")]
    feature_names: Option<PathBuf>,
    /// Metric to optimize, e.g. NDCG@10, MAP, RR@5
    #[arg(long = "metric2t", default_value = "NDCG@10")]
    metric: String,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Worker threads (results do not depend on this)
    #[arg(long, default_value_t = 1)]
    threads: usize,
    /// Output file path for the trained model (JSON). Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Datasets loaded from [`TrainInputArg`].
#[derive(Debug)]
pub(crate) struct LoadedData {
    train: Dataset,
    validation: Option<Dataset>,
    test: Option<Dataset>,
}

impl LoadedData {
    fn load(arg: &TrainInputArg) -> anyhow::Result<Self> {
        let names = arg
            .feature_names
            .as_deref()
            .map(|path| {
                ranktrain_data::load_feature_names(path).with_context(|| {
                    format!("Failed to load feature names: {}", path.display())
                })
            })
            .transpose()?;
        let load = |path: &Path| -> anyhow::Result<Dataset> {
            let dataset = load_dataset(path)?;
            Ok(match &names {
                Some(names) => dataset.with_feature_names(names.clone()),
                None => dataset,
            })
        };
        Ok(Self {
            train: load(&arg.train_file)?,
            validation: arg.validate.as_deref().map(&load).transpose()?,
            test: arg.test.as_deref().map(&load).transpose()?,
        })
    }

    fn training_data(&self) -> TrainingData<'_> {
        TrainingData::new(&self.train)
            .with_validation(self.validation.as_ref())
            .with_test(self.test.as_ref())
    }
}

pub(crate) fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    Dataset::load(path).with_context(|| format!("Failed to load dataset: {}", path.display()))
}

pub(crate) fn print_progress(metric: &str, entry: &TraceEntry) {
    let mut line = format!(
        "restart {:>2}  step {:>4}  train {metric}={:.4}",
        entry.restart, entry.step, entry.train
    );
    if let Some(validation) = entry.validation {
        line.push_str(&format!("  validation={validation:.4}"));
    }
    if let Some(test) = entry.test {
        line.push_str(&format!("  test={test:.4}"));
    }
    println!("{line}");
}

#[cfg(test)]
mod tests {
    use std::{
        env, fs, process,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use clap::CommandFactory as _;
    use ranktrain_evaluator::MetricConfig;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::{
        Layer,
        layer::{Context, SubscriberExt as _},
    };

    use super::*;

    #[test]
    fn test_metric_help_lists_supported_metrics() {
        let command = CommandArgs::command();
        for name in ["coordinate_ascent", "train_random_forest"] {
            let arg = command
                .find_subcommand(name)
                .unwrap()
                .get_arguments()
                .find(|arg| arg.get_long() == Some("metric2t"))
                .unwrap();
            let help = arg.get_help().unwrap().to_string();
            let (_, listed) = help.split_once("e.g. ").unwrap();
            for metric in listed.split(", ") {
                assert!(metric.parse::<MetricConfig>().is_ok(), "{name}: {metric}");
            }
        }
    }

    /// Counts info-level events.
    struct InfoCount(Arc<AtomicUsize>);

    impl<S> Layer<S> for InfoCount
    where
        S: Subscriber,
    {
        fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
            if *event.metadata().level() == Level::INFO {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[test]
    fn test_dataset_load_logs_once() {
        let path = env::temp_dir().join(format!("ranktrain-load-{}.txt", process::id()));
        fs::write(&path, "1 qid:1 1:0.5\n0 qid:1 1:0.25\n").unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(InfoCount(Arc::clone(&count)));
        let dataset =
            tracing::subscriber::with_default(subscriber, || load_dataset(&path)).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(dataset.document_count(), 2);
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }
}
