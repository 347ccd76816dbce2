use ranktrain_training::{
    coordinate_ascent::{CoordinateAscentParams, CoordinateAscentTrainer},
    parse_metric,
};

use crate::{
    command::{LoadedData, TrainInputArg, print_progress},
    schema::model_file::{ModelFile, TrainerParams},
    util::Output,
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct CoordinateAscentArg {
    #[clap(flatten)]
    input: TrainInputArg,
    /// Rescale the final weights so that their absolute values sum to 1
    #[arg(long = "normalize_weights")]
    normalize_weights: bool,
    /// Number of random restarts
    #[arg(long, default_value_t = CoordinateAscentParams::default().restarts)]
    restarts: usize,
    /// Maximum sweeps over all features per restart
    #[arg(long = "max_sweeps", default_value_t = CoordinateAscentParams::default().max_sweeps)]
    max_sweeps: usize,
    /// Minimum metric gain to keep going
    #[arg(long, default_value_t = CoordinateAscentParams::default().tolerance)]
    tolerance: f64,
}

pub(crate) fn run(arg: &CoordinateAscentArg) -> anyhow::Result<()> {
    let CoordinateAscentArg {
        input,
        normalize_weights,
        restarts,
        max_sweeps,
        tolerance,
    } = arg;

    let metric = parse_metric(&input.metric)?;
    let params = CoordinateAscentParams {
        restarts: *restarts,
        max_sweeps: *max_sweeps,
        tolerance: *tolerance,
        normalize_weights: *normalize_weights,
        seed: input.seed,
        threads: input.threads,
    };
    let trainer = CoordinateAscentTrainer::new(metric, params.clone())?;
    let data = LoadedData::load(input)?;

    let metric_name = metric.to_string();
    let trained = trainer
        .train_with_progress(&data.training_data(), |entry| {
            print_progress(&metric_name, entry);
        })?;
    tracing::info!(
        train = trained.summary.train,
        validation = trained.summary.validation,
        test = trained.summary.test,
        "Coordinate ascent finished"
    );

    let model_file = ModelFile {
        name: "coordinate_ascent".to_owned(),
        metric: metric_name,
        params: TrainerParams::CoordinateAscent(params),
        train_metric: trained.summary.train,
        test_metric: trained.summary.test,
        model: trained.model.into(),
    };
    Output::create(input.output.as_deref())?.write_model(&model_file)
}
