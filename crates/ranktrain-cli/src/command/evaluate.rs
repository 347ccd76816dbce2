use std::{io, path::PathBuf};

use anyhow::Context as _;
use ranktrain_data::{Dataset, Judgments};
use ranktrain_evaluator::{MetricConfig, MetricEvaluator, rank_by_score, score_all};

use crate::{command::load_dataset, util};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct EvaluateArg {
    /// Model file written by a training command
    model: PathBuf,
    /// Data to score, in SVMlight/LETOR format
    data_file: PathBuf,
    /// Metric to report. Defaults to the metric the model was trained on.
    #[arg(long)]
    metric: Option<String>,
    /// TREC qrel file; judged documents define each query's ideal ranking
    #[arg(long)]
    qrel: Option<PathBuf>,
    /// Print the metric of every query before the mean
    #[arg(long = "per_query")]
    per_query: bool,
    /// Write a TREC run file with the ranking of every query
    #[arg(long)]
    trecrun: Option<PathBuf>,
    /// System name written in the last column of the run file
    #[arg(long = "system_name", default_value = "ranktrain")]
    system_name: String,
}

pub(crate) fn run(arg: &EvaluateArg) -> anyhow::Result<()> {
    let EvaluateArg {
        model,
        data_file,
        metric,
        qrel,
        per_query,
        trecrun,
        system_name,
    } = arg;

    let model_file = util::read_model_file(model)?;
    let metric_name = metric.as_deref().unwrap_or(&model_file.metric);
    let metric = metric_name
        .parse::<MetricConfig>()
        .with_context(|| format!("Invalid metric: {metric_name}"))?;
    let dataset = load_dataset(data_file)?;

    let scores = score_all(&model_file.model, &dataset);
    let mut evaluator = MetricEvaluator::new(metric, &dataset);
    if let Some(path) = qrel {
        let judgments = Judgments::load(path)
            .with_context(|| format!("Failed to load qrel file: {}", path.display()))?;
        let judged = dataset
            .queries()
            .iter()
            .filter(|query| judgments.query(query.id()).is_some())
            .count();
        tracing::info!(
            path = %path.display(),
            judged,
            queries = dataset.queries().len(),
            "Loaded relevance judgments"
        );
        evaluator = evaluator.with_judgments(&dataset, &judgments);
    }
    if *per_query {
        for (query, value) in dataset.queries().iter().zip(evaluator.per_query(&scores)) {
            match value {
                Some(value) => println!("{metric}\t{}\t{value:.4}", query.id()),
                None => println!("{metric}\t{}\t-", query.id()),
            }
        }
    }
    println!("{metric}\tall\t{:.4}", evaluator.evaluate(&scores));
    if evaluator.contributing_count() < evaluator.query_count() {
        tracing::info!(
            excluded = evaluator.query_count() - evaluator.contributing_count(),
            "Queries without relevant documents are left out of the mean"
        );
    }

    if let Some(path) = trecrun {
        let mut output = util::Output::create(Some(path.as_path()))?;
        write_trec_run(&mut output, &dataset, &scores, system_name)
            .with_context(|| format!("Failed to write run file: {}", output.name()))?;
        output.finish()?;
        tracing::info!(path = %path.display(), "Wrote TREC run");
    }
    Ok(())
}

/// Writes `qid Q0 docname rank score system` lines, best document first.
///
/// Documents without a name are called `<qid>.<position>`, their position in the input.
fn write_trec_run<W>(
    writer: &mut W,
    dataset: &Dataset,
    scores: &[f64],
    system_name: &str,
) -> io::Result<()>
where
    W: io::Write,
{
    let mut offset = 0;
    for query in dataset.queries() {
        let query_scores = &scores[offset..offset + query.len()];
        offset += query.len();
        for (rank, i) in rank_by_score(query_scores).into_iter().enumerate() {
            let qid = query.id();
            let score = query_scores[i];
            match query.documents()[i].name() {
                Some(name) => {
                    writeln!(writer, "{qid} Q0 {name} {} {score} {system_name}", rank + 1)?;
                }
                None => {
                    writeln!(writer, "{qid} Q0 {qid}.{i} {} {score} {system_name}", rank + 1)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_trec_run() {
        let dataset = Dataset::parse(
            "run",
            "0 qid:7 1:0.1 # docid = a\n2 qid:7 1:0.9 # docid = b\n1 qid:8 1:0.5\n0 qid:8 1:0.6\n",
        )
        .unwrap();
        let scores = [0.1, 0.9, 0.5, 0.6];
        let mut buf = Vec::new();
        write_trec_run(&mut buf, &dataset, &scores, "sys").unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "7 Q0 b 1 0.9 sys\n7 Q0 a 2 0.1 sys\n8 Q0 8.1 1 0.6 sys\n8 Q0 8.0 2 0.5 sys\n"
        );
    }
}
