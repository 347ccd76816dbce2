use ranktrain_evaluator::ModelKind;
use ranktrain_training::{
    coordinate_ascent::CoordinateAscentParams, random_forest::RandomForestParams,
};
use serde::{Deserialize, Serialize};

/// A trained model as stored on disk.
///
/// Holds no timestamps: the same inputs and seed always produce the same file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct ModelFile {
    pub name: String,
    /// Metric the model was trained on, e.g. `NDCG@10`.
    pub metric: String,
    pub params: TrainerParams,
    pub train_metric: f64,
    pub test_metric: Option<f64>,
    pub model: ModelKind,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum TrainerParams {
    CoordinateAscent(CoordinateAscentParams),
    RandomForest(RandomForestParams),
}

#[cfg(test)]
mod tests {
    use ranktrain_data::FeatureId;
    use ranktrain_evaluator::LinearModel;

    use super::*;

    #[test]
    fn test_round_trip() {
        let file = ModelFile {
            name: "coordinate_ascent".to_owned(),
            metric: "NDCG@10".to_owned(),
            params: TrainerParams::CoordinateAscent(CoordinateAscentParams::default()),
            train_metric: 0.75,
            test_metric: None,
            model: LinearModel::from_pairs([(FeatureId::new(2).unwrap(), -0.5)]).into(),
        };
        let json = serde_json::to_string_pretty(&file).unwrap();
        let back: ModelFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.model, file.model);
        assert_eq!(serde_json::to_string_pretty(&back).unwrap(), json);
    }
}
