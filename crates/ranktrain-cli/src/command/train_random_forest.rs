use ranktrain_training::{
    ConfigError, parse_metric,
    random_forest::{RandomForestParams, RandomForestTrainer},
};

use crate::{
    command::{LoadedData, TrainInputArg, print_progress},
    schema::model_file::{ModelFile, TrainerParams},
    util::Output,
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainRandomForestArg {
    #[clap(flatten)]
    input: TrainInputArg,
    /// Fraction of queries sampled (with replacement) per tree
    #[arg(long, default_value_t = RandomForestParams::default().srate)]
    srate: f64,
    /// Fraction of features considered at each node
    #[arg(long, default_value_t = RandomForestParams::default().frate)]
    frate: f64,
    /// Random split trials per node
    #[arg(long = "split_candidates", default_value_t = RandomForestParams::default().split_candidates)]
    split_candidates: usize,
    /// Maximum tree depth (0 grows single-leaf trees)
    #[arg(
        long = "max_depth",
        default_value_t = i64::from(RandomForestParams::default().max_depth),
        allow_negative_numbers = true
    )]
    max_depth: i64,
    /// Nodes with fewer documents become leaves
    #[arg(long = "min_leaf_support", default_value_t = RandomForestParams::default().min_leaf_support)]
    min_leaf_support: usize,
    #[arg(long = "num_trees", default_value_t = RandomForestParams::default().num_trees)]
    num_trees: usize,
}

pub(crate) fn run(arg: &TrainRandomForestArg) -> anyhow::Result<()> {
    let TrainRandomForestArg {
        input,
        srate,
        frate,
        split_candidates,
        max_depth,
        min_leaf_support,
        num_trees,
    } = arg;

    let metric = parse_metric(&input.metric)?;
    let params = RandomForestParams {
        num_trees: *num_trees,
        srate: *srate,
        frate: *frate,
        split_candidates: *split_candidates,
        max_depth: depth_limit(*max_depth)?,
        min_leaf_support: *min_leaf_support,
        seed: input.seed,
        threads: input.threads,
    };
    let trainer = RandomForestTrainer::new(metric, params.clone())?;
    let data = LoadedData::load(input)?;

    let metric_name = metric.to_string();
    let trained = trainer
        .train_with_progress(&data.training_data(), |entry| {
            print_progress(&metric_name, entry);
        })?;
    tracing::info!(
        trees = trained.model.trees().len(),
        train = trained.summary.train,
        test = trained.summary.test,
        "Random forest finished"
    );

    let model_file = ModelFile {
        name: "random_forest".to_owned(),
        metric: metric_name,
        params: TrainerParams::RandomForest(params),
        train_metric: trained.summary.train,
        test_metric: trained.summary.test,
        model: trained.model.into(),
    };
    Output::create(input.output.as_deref())?.write_model(&model_file)
}

/// Converts the command-line depth; values beyond `u32` mean "unlimited".
fn depth_limit(value: i64) -> Result<u32, ConfigError> {
    if value < 0 {
        return Err(ConfigError::MaxDepth { value });
    }
    Ok(u32::try_from(value).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_limit() {
        assert_eq!(depth_limit(0), Ok(0));
        assert_eq!(depth_limit(8), Ok(8));
        assert_eq!(depth_limit(i64::MAX), Ok(u32::MAX));
        assert_eq!(depth_limit(-1), Err(ConfigError::MaxDepth { value: -1 }));
    }
}
